use crate::models::{CanonicalField, CanonicalRecord, FieldKind, RawRecord};
use serde_json::Value;

/// Maps raw records onto the canonical shape.
///
/// Normalization is total: any input yields a record, possibly with every field null.
pub struct FieldNormalizer;

impl FieldNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a single raw record
    pub fn normalize(&self, raw: &RawRecord) -> CanonicalRecord {
        let mut record = CanonicalRecord::default();

        for (key, value) in raw.iter() {
            let Some(field) = CanonicalField::from_key(key) else {
                continue;
            };

            // First non-null value for a field wins when several casings are present.
            match field.kind() {
                FieldKind::Integer => {
                    let slot = match field {
                        CanonicalField::SiteId => &mut record.site_id,
                        _ => &mut record.aqi,
                    };
                    if slot.is_none() {
                        *slot = coerce_integer(value);
                    }
                }
                FieldKind::Float => {
                    let slot = match field {
                        CanonicalField::Latitude => &mut record.latitude,
                        _ => &mut record.longitude,
                    };
                    if slot.is_none() {
                        *slot = coerce_float(value);
                    }
                }
                FieldKind::Text => {
                    let slot = match field {
                        CanonicalField::SiteName => &mut record.site_name,
                        CanonicalField::County => &mut record.county,
                        _ => &mut record.status,
                    };
                    if slot.is_none() {
                        *slot = coerce_text(value);
                    }
                }
                FieldKind::Timestamp => {
                    if record.data_creation_date.is_none() {
                        record.data_creation_date = coerce_text(value);
                    }
                }
            }
        }

        record
    }

    pub fn normalize_all<'a, I>(&self, raws: I) -> Vec<CanonicalRecord>
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        raws.into_iter().map(|raw| self.normalize(raw)).collect()
    }
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_null_sentinel(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.eq_ignore_ascii_case("nan")
}

/// Integer parse, then float-then-truncate, else null.
pub fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            if is_null_sentinel(s) {
                return None;
            }
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    // i64::MAX is not representable as f64; the exclusive upper bound keeps the cast exact.
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

pub fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !is_null_sentinel(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Text values: "nan" and blank become null, numbers keep their textual form.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if is_null_sentinel(s) => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_field_casing_maps_to_same_field() {
        let normalizer = FieldNormalizer::new();
        for key in ["AQI", "aqi", "Aqi", "aQi"] {
            let record = normalizer.normalize(&raw(json!({ key: "57" })));
            assert_eq!(record.aqi, Some(57), "key {key}");
        }
    }

    #[test]
    fn test_numeric_sentinels_become_null() {
        for input in [json!("nan"), json!("NaN"), json!(""), json!("  "), json!("n/a"), json!(null), json!(true)] {
            assert_eq!(coerce_integer(&input), None, "input {input}");
            assert_eq!(coerce_float(&input), None, "input {input}");
        }
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce_integer(&json!("123")), Some(123));
        assert_eq!(coerce_integer(&json!(" 45 ")), Some(45));
        assert_eq!(coerce_integer(&json!("12.9")), Some(12));
        assert_eq!(coerce_integer(&json!("-3.7")), Some(-3));
        assert_eq!(coerce_integer(&json!("1e3")), Some(1000));
        assert_eq!(coerce_integer(&json!(88)), Some(88));
        assert_eq!(coerce_integer(&json!(88.6)), Some(88));
        assert_eq!(coerce_integer(&json!("inf")), None);
        assert_eq!(coerce_integer(&json!(1e300)), None);
    }

    #[test]
    fn test_float_coercion_keeps_fraction() {
        assert_eq!(coerce_float(&json!("121.5149")), Some(121.5149));
        assert_eq!(coerce_float(&json!(25.06)), Some(25.06));
        assert_eq!(coerce_float(&json!("NaN")), None);
    }

    #[test]
    fn test_text_nan_becomes_null() {
        assert_eq!(coerce_text(&json!("nan")), None);
        assert_eq!(coerce_text(&json!("NAN")), None);
        assert_eq!(coerce_text(&json!("良好")), Some("良好".to_string()));
        assert_eq!(coerce_text(&json!(12)), Some("12".to_string()));
    }

    #[test]
    fn test_unknown_fields_dropped_and_missing_fields_null() {
        let record = FieldNormalizer::new().normalize(&raw(json!({
            "pm2.5": "12",
            "pollutant": "細懸浮微粒",
            "county": "臺北市"
        })));

        assert_eq!(
            record,
            CanonicalRecord {
                county: Some("臺北市".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_first_non_null_casing_wins() {
        let record = FieldNormalizer::new().normalize(&raw(json!({
            "AQI": "nan",
            "aqi": "61",
            "Aqi": "99"
        })));
        assert_eq!(record.aqi, Some(61));
    }

    #[test]
    fn test_end_to_end_example_record() {
        let record = FieldNormalizer::new().normalize(&raw(json!({
            "siteid": "123",
            "sitename": "Test",
            "aqi": "nan",
            "datacreationdate": "2024-01-01 00:00:00"
        })));

        assert_eq!(
            record,
            CanonicalRecord {
                site_id: Some(123),
                site_name: Some("Test".to_string()),
                data_creation_date: Some("2024-01-01 00:00:00".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_empty_input_yields_all_null_record() {
        let record = FieldNormalizer::new().normalize(&RawRecord::new());
        assert_eq!(record, CanonicalRecord::default());
    }
}
