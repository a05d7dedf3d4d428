pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod loaders;
pub mod models;
pub mod processors;
pub mod readers;
pub mod storage;
pub mod utils;

pub use error::{ProcessingError, Result};
