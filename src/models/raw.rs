use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One untyped record as it arrived from an external source.
///
/// Keys keep their original spelling and insertion order; values are whatever JSON
/// scalar the source produced (CSV cells arrive as strings).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(IndexMap<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_preserves_key_order() {
        let raw: RawRecord =
            serde_json::from_value(json!({"sitename": "Test", "SiteId": "1", "aqi": 3})).unwrap();

        let keys: Vec<&str> = raw.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["sitename", "SiteId", "aqi"]);
        assert_eq!(raw.get("aqi"), Some(&json!(3)));
    }

    #[test]
    fn test_from_pairs() {
        let raw: RawRecord = [("siteid", "12"), ("county", "Taipei")].into_iter().collect();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.get("county"), Some(&json!("Taipei")));
    }
}
