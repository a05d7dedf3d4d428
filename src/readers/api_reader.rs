use crate::config::Settings;
use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalField, RawRecord};
use crate::utils::constants::{API_FORMAT, API_SORT_ORDER, STORAGE_TIMESTAMP_FORMAT};
use crate::utils::decode_utf8;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// A source of recent raw readings.
#[async_trait]
pub trait RecordSource {
    /// Fetch readings created strictly after `since`.
    async fn fetch_since(&self, since: NaiveDateTime) -> Result<Vec<RawRecord>>;
}

/// Client for the environmental-monitoring AQI endpoint.
pub struct AqiApiClient {
    client: Client,
    url: String,
    api_key: String,
    row_limit: u32,
}

impl AqiApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            url: settings.api_url.clone(),
            api_key,
            row_limit: settings.row_limit,
        })
    }

    fn query_params(&self, since: NaiveDateTime) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("limit", self.row_limit.to_string()),
            ("sort", API_SORT_ORDER.to_string()),
            ("format", API_FORMAT.to_string()),
            ("filters", time_filter(since)),
        ]
    }
}

#[async_trait]
impl RecordSource for AqiApiClient {
    async fn fetch_since(&self, since: NaiveDateTime) -> Result<Vec<RawRecord>> {
        tracing::info!("Requesting readings created after {}", since);

        let response = self
            .client
            .get(&self.url)
            .query(&self.query_params(since))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return Err(ProcessingError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let text = decode_utf8(&bytes);
        if text.trim().is_empty() {
            return Err(ProcessingError::EmptyResponse);
        }

        let rows = parse_csv(&text)?;
        tracing::info!("Fetched {} raw rows", rows.len());
        Ok(rows)
    }
}

/// `datacreationdate,GR,<timestamp>`: the API's greater-than filter.
pub fn time_filter(since: NaiveDateTime) -> String {
    format!("datacreationdate,GR,{}", since.format(STORAGE_TIMESTAMP_FORMAT))
}

/// Parse the CSV export into raw records keyed by header.
///
/// Expected columns that are absent are logged and otherwise ignored.
pub fn parse_csv(text: &str) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();

    for missing in missing_columns(&headers) {
        tracing::warn!("API response is missing column '{}'; it will be null", missing);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn missing_columns(headers: &csv::StringRecord) -> Vec<&'static str> {
    CanonicalField::ALL
        .iter()
        .map(|field| field.source_key())
        .filter(|key| !headers.iter().any(|h| h.eq_ignore_ascii_case(key)))
        .collect()
}
