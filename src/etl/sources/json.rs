use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::errors::EtlError;

const RECORD_KEYS: [&str; 7] = ["data", "results", "records", "features", "items", "rows", "value"];

pub fn read_json(path: &Path) -> Result<Value, EtlError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Reads a JSON export and returns its records, whatever envelope the
/// publishing portal wrapped them in.
pub fn load_json_records(path: &Path) -> Result<Vec<Map<String, Value>>, EtlError> {
    let value = read_json(path)?;
    records_from_value(value).ok_or_else(|| EtlError::Format(format!("unrecognized JSON layout in {}", path.display())))
}

pub fn records_from_value(value: Value) -> Option<Vec<Map<String, Value>>> {
    match value {
        Value::Array(items) => Some(objects(items)),
        Value::Object(mut map) => {
            for key in RECORD_KEYS {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return Some(objects(items));
                    }
                }
            }
            let first_list = map
                .iter()
                .find(|(_, v)| matches!(v, Value::Array(items) if !items.is_empty()))
                .map(|(k, _)| k.clone());
            if let Some(key) = first_list {
                if let Some(Value::Array(items)) = map.remove(&key) {
                    return Some(objects(items));
                }
            }
            Some(vec![map])
        }
        _ => None,
    }
}

/// Drops non-object entries (some exports mix status strings into the list).
fn objects(items: Vec<Value>) -> Vec<Map<String, Value>> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Open-data APIs answer `{"error": ...}` instead of an empty list on failure.
pub fn is_api_error(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.get("error").map(|e| !e.is_null() && e != &Value::Bool(false)).unwrap_or(false),
        Value::Array(items) => items.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn plain_list() {
        let records = records_from_value(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn mixed_list_keeps_objects() {
        let records = records_from_value(json!(["meta", {"a": 1}, 3])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["a"], json!(1));
    }

    #[test]
    fn known_envelope_key() {
        let records = records_from_value(json!({"count": 2, "results": [{"a": 1}, {"a": 2}]})).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn first_non_empty_list() {
        let records = records_from_value(json!({"empty": [], "municipios": [{"a": 1}]})).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn single_object() {
        let records = records_from_value(json!({"a": 1, "b": "x"})).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["b"], json!("x"));
    }

    #[test]
    fn scalars_are_rejected() {
        assert!(records_from_value(json!(42)).is_none());
    }

    #[test]
    fn api_errors() {
        assert!(is_api_error(&json!({"error": "timeout"})));
        assert!(is_api_error(&json!([])));
        assert!(!is_api_error(&json!([{"a": 1}])));
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"data\": [{{\"x\": 1}}]}}").unwrap();
        let records = load_json_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }
}
