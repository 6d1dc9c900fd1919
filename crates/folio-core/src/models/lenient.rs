//! Forgiving deserializers for the duck-typed portfolio document.
//!
//! The document is edited by hand in an admin panel and stored by a schemaless
//! backend, so shapes drift. These helpers coerce instead of failing:
//! a scalar where a list belongs becomes a one-element list, a non-object where
//! a record belongs becomes absent, numbers where text belongs are stringified.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize an optional sequence, coercing non-list values.
pub fn seq<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(coerce_seq))
}

/// Deserialize an optional record; anything that is not an object is absent.
pub fn record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(coerce_record))
}

/// Deserialize optional text, stringifying numbers and booleans.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

/// Deserialize a flag that may arrive as bool, number, string, or null.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => crate::util::is_truthy(&text),
        _ => false,
    })
}

/// Coerce a JSON value into a list of `T`.
///
/// `null` is absent, a non-array is wrapped, entries that fail to decode are
/// dropped.
pub fn coerce_seq<T: DeserializeOwned>(value: Value) -> Option<Vec<T>> {
    let items = match value {
        Value::Null => return None,
        Value::Array(items) => items,
        other => {
            tracing::debug!("Coercing scalar into single-element list");
            vec![other]
        }
    };

    Some(
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(decoded) => Some(decoded),
                Err(error) => {
                    tracing::warn!(%error, "Dropping undecodable sequence entry");
                    None
                }
            })
            .collect(),
    )
}

/// Coerce a JSON value into a record `T`, or absent.
pub fn coerce_record<T: DeserializeOwned>(value: Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            tracing::warn!(%error, "Treating undecodable record as absent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Holder {
        #[serde(default, deserialize_with = "seq")]
        items: Option<Vec<Value>>,
        #[serde(default, deserialize_with = "text")]
        label: Option<String>,
        #[serde(default, deserialize_with = "flag")]
        enabled: bool,
    }

    #[test]
    fn seq_wraps_scalars_and_keeps_lists() {
        let wrapped: Holder = serde_json::from_value(json!({ "items": { "a": 1 } })).unwrap();
        assert_eq!(wrapped.items, Some(vec![json!({ "a": 1 })]));

        let list: Holder = serde_json::from_value(json!({ "items": [1, 2] })).unwrap();
        assert_eq!(list.items.map(|items| items.len()), Some(2));

        let null: Holder = serde_json::from_value(json!({ "items": null })).unwrap();
        assert_eq!(null.items, None);

        let missing: Holder = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.items, None);
    }

    #[test]
    fn text_stringifies_numbers_and_drops_objects() {
        let number: Holder = serde_json::from_value(json!({ "label": 42 })).unwrap();
        assert_eq!(number.label.as_deref(), Some("42"));

        let object: Holder = serde_json::from_value(json!({ "label": { "x": 1 } })).unwrap();
        assert_eq!(object.label, None);
    }

    #[test]
    fn flag_accepts_loose_spellings() {
        let from_string: Holder = serde_json::from_value(json!({ "enabled": "true" })).unwrap();
        assert!(from_string.enabled);

        let from_number: Holder = serde_json::from_value(json!({ "enabled": 1 })).unwrap();
        assert!(from_number.enabled);

        let from_null: Holder = serde_json::from_value(json!({ "enabled": null })).unwrap();
        assert!(!from_null.enabled);
    }

    #[test]
    fn coerce_seq_drops_undecodable_entries() {
        let decoded: Option<Vec<u32>> = coerce_seq(json!([1, "two", 3]));
        assert_eq!(decoded, Some(vec![1, 3]));
    }

    #[test]
    fn coerce_record_rejects_non_objects() {
        let decoded: Option<serde_json::Map<String, Value>> = coerce_record(json!("oops"));
        assert!(decoded.is_none());
    }
}
