use crate::utils::constants::{HISTORICAL_TABLE, RECENT_TABLE};

/// Schema version recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Both tables use (SiteId, DataCreationDate) as their primary key; the write
/// statements rely on it for replace and ignore semantics.
pub const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS air_quality_records (
    SiteId           INTEGER NOT NULL,
    SiteName         TEXT,
    County           TEXT,
    AQI              INTEGER,
    Status           TEXT,
    DataCreationDate TEXT NOT NULL,
    Latitude         REAL,
    Longitude        REAL,
    PRIMARY KEY (SiteId, DataCreationDate)
);
CREATE INDEX IF NOT EXISTS idx_air_quality_records_county
    ON air_quality_records (County);

CREATE TABLE IF NOT EXISTS historical_aqi_analysis (
    SiteId           INTEGER NOT NULL,
    SiteName         TEXT,
    County           TEXT,
    AQI              INTEGER,
    Status           TEXT,
    DataCreationDate TEXT NOT NULL,
    PRIMARY KEY (SiteId, DataCreationDate)
);
CREATE INDEX IF NOT EXISTS idx_historical_aqi_analysis_county_date
    ON historical_aqi_analysis (County, DataCreationDate);
";

pub const REPLACE_RECENT: &str = "
INSERT OR REPLACE INTO air_quality_records
    (SiteId, SiteName, County, AQI, Status, DataCreationDate, Latitude, Longitude)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

pub const INSERT_IGNORE_HISTORICAL: &str = "
INSERT OR IGNORE INTO historical_aqi_analysis
    (SiteId, SiteName, County, AQI, Status, DataCreationDate)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Live readings, replace on write.
    Recent,
    /// Lean historical readings, ignore duplicates on write.
    Historical,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Recent => RECENT_TABLE,
            Table::Historical => HISTORICAL_TABLE,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
