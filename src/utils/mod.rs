pub mod constants;
pub mod encoding;
pub mod progress;
pub mod timestamp;

pub use constants::*;
pub use encoding::decode_utf8;
pub use progress::ProgressReporter;
pub use timestamp::{parse_timestamp, storage_timestamp};
