use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    DEFAULT_API_URL, DEFAULT_CHUNK_SIZE, DEFAULT_HISTORY_DIR, DEFAULT_LOOKBACK_HOURS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Optional settings file read from the working directory.
pub const CONFIG_FILE: &str = "aqi-etl";
/// Prefix of environment variables, e.g. `AQI_DATABASE_PATH`.
pub const ENV_PREFIX: &str = "AQI";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// SQLite database file. Required by every command that touches storage.
    pub database_path: Option<PathBuf>,

    pub api_url: String,

    /// Required by `sync` only.
    pub api_key: Option<String>,

    #[validate(range(min = 1, max = 720))]
    pub lookback_hours: u32,

    #[validate(range(min = 1))]
    pub row_limit: u32,

    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    pub accept_invalid_certs: bool,

    pub history_dir: PathBuf,

    #[validate(range(min = 1))]
    pub chunk_size: usize,

    pub server_host: String,

    pub server_port: u16,
}

impl Settings {
    /// Load defaults, then `aqi-etl.toml` if present, then `AQI_*` environment variables.
    pub fn load() -> Result<Self> {
        // A missing .env file is fine; explicit environment still applies.
        let _ = dotenvy::dotenv();

        let builder = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX));
        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("lookback_hours", DEFAULT_LOOKBACK_HOURS)?
            .set_default("row_limit", DEFAULT_ROW_LIMIT)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .set_default("accept_invalid_certs", false)?
            .set_default("history_dir", DEFAULT_HISTORY_DIR)?
            .set_default("chunk_size", DEFAULT_CHUNK_SIZE)?
            .set_default("server_host", DEFAULT_SERVER_HOST)?
            .set_default("server_port", DEFAULT_SERVER_PORT)?)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn require_database(&self) -> Result<&Path> {
        self.database_path
            .as_deref()
            .ok_or_else(|| missing("database_path"))
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| missing("api_key"))
    }
}

fn missing(key: &str) -> ProcessingError {
    ProcessingError::Config(format!(
        "missing required setting '{}' (set {}_{})",
        key,
        ENV_PREFIX,
        key.to_uppercase()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings> {
        Settings::build(Settings::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let settings = from_toml("")?;

        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.lookback_hours, 25);
        assert_eq!(settings.row_limit, 5000);
        assert_eq!(settings.request_timeout_secs, 90);
        assert_eq!(settings.chunk_size, 5000);
        assert_eq!(settings.history_dir, PathBuf::from("history_records"));
        assert_eq!(settings.server_port, 5000);
        assert!(!settings.accept_invalid_certs);
        Ok(())
    }

    #[test]
    fn test_missing_required_settings() -> Result<()> {
        let settings = from_toml("")?;
        assert!(matches!(
            settings.require_database(),
            Err(ProcessingError::Config(_))
        ));
        assert!(matches!(
            settings.require_api_key(),
            Err(ProcessingError::Config(_))
        ));
        Ok(())
    }

    #[test]
    fn test_overrides_and_range_checks() -> Result<()> {
        let settings = from_toml(
            "database_path = \"aqi.db\"\napi_key = \"secret\"\nlookback_hours = 48\n",
        )?;
        assert_eq!(settings.require_database()?, Path::new("aqi.db"));
        assert_eq!(settings.require_api_key()?, "secret");
        assert_eq!(settings.lookback_hours, 48);

        assert!(matches!(
            from_toml("chunk_size = 0\n"),
            Err(ProcessingError::Validation(_))
        ));
        Ok(())
    }
}
