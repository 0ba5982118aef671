//! Canonical JSON and SHA-256 digests for proof payloads.
//!
//! Object keys are sorted by Unicode code point, integer-valued floats are
//! written as integers and non-finite numbers are rejected. The output is
//! compact (no insignificant whitespace).

use crate::core::error::DomainError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

// `Map` keeps insertion order if serde_json's `preserve_order` is enabled
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            let mut sorted = Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), sort_keys(v));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn normalize_numbers(value: &Value) -> Result<Value, DomainError> {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::new();
            for (k, v) in map {
                normalized.insert(k.clone(), normalize_numbers(v)?);
            }
            Ok(Value::Object(normalized))
        }
        Value::Array(items) => items
            .iter()
            .map(normalize_numbers)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Number(n) if n.is_f64() => {
            let Some(f) = n.as_f64() else {
                return Ok(Value::Number(n.clone()));
            };
            if !f.is_finite() {
                return Err(DomainError::Canonicalization(
                    "NaN/Infinity not permitted in canonical JSON".to_string(),
                ));
            }
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(Value::Number(Number::from(f as i64)))
            } else {
                Ok(Value::Number(n.clone()))
            }
        }
        other => Ok(other.clone()),
    }
}

/// Canonical form of a JSON value: normalized numbers, sorted keys, compact.
pub fn canonical_json(value: &Value) -> Result<String, DomainError> {
    let normalized = normalize_numbers(value)?;
    Ok(serde_json::to_string(&sort_keys(&normalized))?)
}

/// Canonical JSON of any serializable value
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, DomainError> {
    canonical_json(&serde_json::to_value(value)?)
}

/// Lowercase hex SHA-256 of raw bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of the canonical JSON of a serializable value
pub fn canonical_digest<T: Serialize + ?Sized>(value: &T) -> Result<String, DomainError> {
    Ok(sha256_hex(to_canonical_json(value)?.as_bytes()))
}
