//! Helpers shared by the request/response marshalling of every resource.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::client::strip_nulls;
use crate::error::ProviderError;

/// Decode declared fields out of a state or config object.
///
/// Nulls are dropped first so that unset attributes fall back to the
/// field's `Default`.
pub fn decode_state<T: DeserializeOwned>(state: &Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(strip_nulls(state.clone()))?)
}

/// The `id` recorded in state.
pub fn state_id(state: &Value) -> Result<String, ProviderError> {
    match state.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ProviderError::InvalidRequest(
            "resource state has no id".to_string(),
        )),
    }
}

/// Percent-encode a value used as a single URL path segment.
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Overlay the fields of `overlay` on top of `base`.
///
/// Fields only present in `base` (write-only secrets, for instance) survive.
pub fn merge(base: &Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (k, v) in overlay {
                merged.insert(k, v);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Accept a JSON bool or the strings `"true"` / `"false"`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(de::Error::custom(format!("expected boolean, got \"{}\"", other))),
        },
    }
}

/// Accept a JSON string or number, yielding its string form.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
