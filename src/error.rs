use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Upstream API returned status {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("Upstream API returned an empty body")]
    EmptyResponse,

    #[error("Unexpected snapshot shape in {file}: {message}")]
    InvalidShape { file: String, message: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
