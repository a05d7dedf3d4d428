pub mod api_reader;
pub mod snapshot_reader;

pub use api_reader::{parse_csv, AqiApiClient, RecordSource};
pub use snapshot_reader::SnapshotReader;
