pub mod schema;
pub mod store;

pub use schema::Table;
pub use store::Store;
