//! Deterministic cache keys for dashboard parameter sets.
//!
//! The same logical filter set must map to the same key regardless of how
//! the caller assembled it: object keys are sorted, array contents are
//! sorted by their stringified form, and empty values are dropped before
//! hashing.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

const HASH_LEN: usize = 16;

/// Build `"<prefix>:<hash>"` for an operation and its parameters.
pub fn build_cache_key<P: Serialize>(prefix: &str, params: &P) -> String {
    let value = serde_json::to_value(params).unwrap_or(Value::Null);
    let payload = normalize(value)
        .map(|v| v.to_string())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}:{}", prefix, &digest[..HASH_LEN])
}

/// Recursively normalize a parameter value. Returns `None` for values that
/// carry no filter information (null, empty string, empty array, object with
/// nothing left after normalization).
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let mut normalized: Vec<Value> =
                items.into_iter().filter_map(normalize).collect();
            if normalized.is_empty() {
                return None;
            }
            normalized.sort_by_key(|v| v.to_string());
            Some(Value::Array(normalized))
        }
        Value::Object(map) => {
            // serde_json's default map is ordered by key, so rebuilding it
            // entry by entry keeps the serialization canonical.
            let normalized: serde_json::Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if normalized.is_empty() {
                return None;
            }
            Some(Value::Object(normalized))
        }
        other => Some(other),
    }
}
