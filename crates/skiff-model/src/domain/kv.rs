use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A `{name, value}` pair, the shape container environments are sent in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

impl NameValue {
    pub fn new<K, V>(name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A `{key, value}` pair, the shape resource tags are sent in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Convert a mapping into the ordered `{name, value}` list form.
///
/// Order follows the map's key order, so the output is deterministic.
pub fn to_name_values(map: &BTreeMap<String, String>) -> Vec<NameValue> {
    map.iter().map(|(k, v)| NameValue::new(k, v)).collect()
}

/// Convert a mapping into the ordered `{key, value}` list form.
pub fn to_key_values(map: &BTreeMap<String, String>) -> Vec<KeyValue> {
    map.iter().map(|(k, v)| KeyValue::new(k, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_env_entry_converts_to_name_value() {
        let map = BTreeMap::from([("FOO".to_string(), "BAR".to_string())]);
        let json = serde_json::to_value(to_name_values(&map)).unwrap();
        assert_eq!(json, serde_json::json!([{"name": "FOO", "value": "BAR"}]));
    }

    #[test]
    fn single_tag_converts_to_key_value() {
        let map = BTreeMap::from([("team".to_string(), "data".to_string())]);
        let json = serde_json::to_value(to_key_values(&map)).unwrap();
        assert_eq!(json, serde_json::json!([{"key": "team", "value": "data"}]));
    }

    #[test]
    fn conversion_is_ordered_by_key() {
        let map = BTreeMap::from([
            ("B".to_string(), "2".to_string()),
            ("A".to_string(), "1".to_string()),
        ]);
        let names: Vec<_> = to_name_values(&map).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
