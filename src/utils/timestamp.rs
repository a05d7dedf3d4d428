use crate::utils::constants::{API_TIMESTAMP_FORMAT, STORAGE_TIMESTAMP_FORMAT};
use chrono::{DateTime, NaiveDateTime};

const ACCEPTED_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
];

/// Parse the timestamp spellings seen in API responses and snapshot files.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Storage spelling of a timestamp. Unparseable input is kept verbatim.
pub fn storage_timestamp(value: &str) -> String {
    match parse_timestamp(value) {
        Some(ts) => ts.format(STORAGE_TIMESTAMP_FORMAT).to_string(),
        None => value.trim().to_string(),
    }
}

/// `YYYY-MM-DDTHH:MM:SS` spelling used in API responses.
pub fn api_timestamp(value: &str) -> String {
    match parse_timestamp(value) {
        Some(ts) => ts.format(API_TIMESTAMP_FORMAT).to_string(),
        None => value.to_string(),
    }
}
