/// Table names
pub const RECENT_TABLE: &str = "air_quality_records";
pub const HISTORICAL_TABLE: &str = "historical_aqi_analysis";

/// Upstream API defaults
pub const DEFAULT_API_URL: &str = "https://data.moenv.gov.tw/api/v2/aqx_p_488";
pub const DEFAULT_LOOKBACK_HOURS: i64 = 25;
pub const DEFAULT_ROW_LIMIT: i64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 90;
pub const API_SORT_ORDER: &str = "datacreationdate desc";
pub const API_FORMAT: &str = "csv";

/// Historical import defaults
pub const DEFAULT_HISTORY_DIR: &str = "history_records";
pub const DEFAULT_CHUNK_SIZE: i64 = 5000;
pub const SNAPSHOT_EXTENSION: &str = "json";
pub const CONFIRMATION_WORD: &str = "yes";

/// Aggregation API defaults
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: i64 = 5000;

/// Daily-average AQI bucket bounds
pub const GOOD_AQI_MAX: f64 = 50.0;
pub const MODERATE_AQI_MAX: f64 = 100.0;

/// Timestamp formats
pub const STORAGE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
