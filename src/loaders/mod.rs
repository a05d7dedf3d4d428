pub mod historical;
pub mod incremental;

pub use historical::{
    AuditOutcome, CheckReport, ChunkOutcome, FileCheck, FileImport, HistoricalLoader,
    ImportConfirmation, ImportReport,
};
pub use incremental::{IncrementalLoader, SyncReport, SyncState};
