use serde::{Deserialize, Serialize};

/// The fixed dictionary of fields the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    SiteId,
    SiteName,
    County,
    Aqi,
    Status,
    DataCreationDate,
    Latitude,
    Longitude,
}

/// How a field's raw value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
    Timestamp,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::SiteId,
        CanonicalField::SiteName,
        CanonicalField::County,
        CanonicalField::Aqi,
        CanonicalField::Status,
        CanonicalField::DataCreationDate,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
    ];

    /// Canonical casing used in storage and API output.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::SiteId => "SiteId",
            CanonicalField::SiteName => "SiteName",
            CanonicalField::County => "County",
            CanonicalField::Aqi => "AQI",
            CanonicalField::Status => "Status",
            CanonicalField::DataCreationDate => "DataCreationDate",
            CanonicalField::Latitude => "Latitude",
            CanonicalField::Longitude => "Longitude",
        }
    }

    /// Lower-case column name used by the upstream API and snapshot files.
    pub fn source_key(&self) -> &'static str {
        match self {
            CanonicalField::SiteId => "siteid",
            CanonicalField::SiteName => "sitename",
            CanonicalField::County => "county",
            CanonicalField::Aqi => "aqi",
            CanonicalField::Status => "status",
            CanonicalField::DataCreationDate => "datacreationdate",
            CanonicalField::Latitude => "latitude",
            CanonicalField::Longitude => "longitude",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            CanonicalField::SiteId | CanonicalField::Aqi => FieldKind::Integer,
            CanonicalField::Latitude | CanonicalField::Longitude => FieldKind::Float,
            CanonicalField::DataCreationDate => FieldKind::Timestamp,
            CanonicalField::SiteName | CanonicalField::County | CanonicalField::Status => {
                FieldKind::Text
            }
        }
    }

    /// Case-insensitive lookup of a source key.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.source_key().eq_ignore_ascii_case(key))
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One AQI reading in canonical shape. Every field may be null at this stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "SiteId")]
    pub site_id: Option<i64>,
    #[serde(rename = "SiteName")]
    pub site_name: Option<String>,
    #[serde(rename = "County")]
    pub county: Option<String>,
    #[serde(rename = "AQI")]
    pub aqi: Option<i64>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "DataCreationDate")]
    pub data_creation_date: Option<String>,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
}

/// A record that passed validation: both identity fields are present.
///
/// Loaders only accept this type, so nothing reaches storage without an identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidRecord {
    #[serde(rename = "SiteId")]
    pub site_id: i64,
    #[serde(rename = "SiteName")]
    pub site_name: Option<String>,
    #[serde(rename = "County")]
    pub county: Option<String>,
    #[serde(rename = "AQI")]
    pub aqi: Option<i64>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "DataCreationDate")]
    pub data_creation_date: String,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
}
