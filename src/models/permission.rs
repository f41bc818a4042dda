//! Normalization of the polymorphic card permission column.
//!
//! The `cards.permissions` JSON column holds one of three shapes: a list of
//! permission keys, a key->bool map, or a JSON string wrapping either. The
//! shapes are resolved here, once, at the storage boundary; the evaluator
//! only ever sees the normalized key->bool map.

use std::collections::BTreeMap;

use serde_json::Value;

/// A card's permission grant as persisted: either a bare list of keys
/// (presence means granted) or an explicit key->bool map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSpec {
    List(Vec<String>),
    Map(BTreeMap<String, bool>),
}

impl PermissionSpec {
    /// Parses the raw JSON column value. Returns `None` for a null column,
    /// an unparseable string, or a shape that is neither list nor map; the
    /// evaluator treats all of those as "this card grants nothing".
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) => {
                let inner: Value = serde_json::from_str(raw).ok()?;
                // One level of unwrapping only; a string inside a string
                // is not a representation we ever wrote.
                match inner {
                    Value::String(_) => None,
                    other => Self::from_value(&other),
                }
            }
            Value::Array(items) => {
                let keys = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::List(keys))
            }
            Value::Object(map) => {
                let entries = map
                    .iter()
                    .map(|(key, val)| truthy(val).map(|b| (key.clone(), b)))
                    .collect::<Option<BTreeMap<_, _>>>()?;
                Some(Self::Map(entries))
            }
            _ => None,
        }
    }

    /// Resolves to the normalized key->bool mapping. List entries are
    /// granted; map entries keep their explicit value.
    pub fn normalize(&self) -> BTreeMap<String, bool> {
        match self {
            Self::List(keys) => keys.iter().map(|k| (k.clone(), true)).collect(),
            Self::Map(map) => map.clone(),
        }
    }

    /// Whether `key` is granted. A missing key and an explicit `false`
    /// both deny; the caller does not need to distinguish them.
    pub fn allows(&self, key: &str) -> bool {
        match self {
            Self::List(keys) => keys.iter().any(|k| k == key),
            Self::Map(map) => map.get(key).copied().unwrap_or(false),
        }
    }

    /// All granted keys, in iteration order of the underlying shape.
    pub fn granted_keys(&self) -> Vec<String> {
        match self {
            Self::List(keys) => keys.clone(),
            Self::Map(map) => map
                .iter()
                .filter(|&(_, &granted)| granted)
                .map(|(k, _)| k.clone())
                .collect(),
        }
    }

    /// Serializes back to the JSON column representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::List(keys) => Value::Array(keys.iter().cloned().map(Value::String).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, &v)| (k.clone(), Value::Bool(v)))
                    .collect(),
            ),
        }
    }
}

/// Maps a JSON value in a permission map to its boolean meaning. The
/// original data contains both `true` and `"true"` for granted entries.
fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(s == "true"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_presence_grants() {
        let spec = PermissionSpec::from_value(&json!(["wechat", "ximalaya"])).unwrap();
        assert!(spec.allows("wechat"));
        assert!(!spec.allows("douyin"));
    }

    #[test]
    fn map_explicit_false_denies() {
        let spec = PermissionSpec::from_value(&json!({"wechat": true, "ximalaya": false})).unwrap();
        assert!(spec.allows("wechat"));
        assert!(!spec.allows("ximalaya"));
        assert!(!spec.allows("douyin"));
    }

    #[test]
    fn string_truthiness_in_map() {
        let spec =
            PermissionSpec::from_value(&json!({"wechat": "true", "douyin": "false"})).unwrap();
        assert!(spec.allows("wechat"));
        assert!(!spec.allows("douyin"));
    }

    #[test]
    fn serialized_forms_parse() {
        let as_list = PermissionSpec::from_value(&json!("[\"wechat\"]")).unwrap();
        assert!(as_list.allows("wechat"));

        let as_map = PermissionSpec::from_value(&json!("{\"wechat\": true}")).unwrap();
        assert!(as_map.allows("wechat"));
    }

    #[test]
    fn garbage_is_absent() {
        assert_eq!(PermissionSpec::from_value(&json!("not json")), None);
        assert_eq!(PermissionSpec::from_value(&json!(42)), None);
        assert_eq!(PermissionSpec::from_value(&Value::Null), None);
        assert_eq!(PermissionSpec::from_value(&json!([1, 2])), None);
    }

    #[test]
    fn normalize_round_trips_allow_set() {
        let list = PermissionSpec::List(vec!["a".into(), "b".into()]);
        let normalized = PermissionSpec::Map(list.normalize());
        assert_eq!(
            PermissionSpec::from_value(&normalized.to_value()).unwrap(),
            normalized
        );
        assert_eq!(list.granted_keys(), normalized.granted_keys());
    }

    #[test]
    fn granted_keys_skip_false_entries() {
        let spec = PermissionSpec::from_value(&json!({"a": true, "b": false})).unwrap();
        assert_eq!(spec.granted_keys(), vec!["a".to_string()]);
    }
}
