//! # Canonical Serialization: JCS Byte Production
//!
//! `CanonicalBytes` is the only input accepted by [`sha256_digest()`]. Record
//! fingerprints and certificate identifiers are both derived through it, so
//! two processes that hold the same logical record always agree on its
//! digest regardless of field order or whitespace.
//!
//! ## Rules
//!
//! 1. **Reject floats.** JCS number formatting has edge cases that make
//!    floats non-deterministic across implementations. Counters and
//!    sequence numbers are integers.
//! 2. **Sorted keys, compact separators** via `serde_jcs` (RFC 8785).
//! 3. **Timestamps** reach this layer already normalized by
//!    [`Timestamp`](crate::Timestamp) (UTC, `Z` suffix, seconds precision).
//!
//! [`sha256_digest()`]: crate::sha256_digest

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Constructed only through [`CanonicalBytes::new()`] or
///   [`CanonicalBytes::from_value()`].
/// - No float numbers.
/// - Object keys sorted, compact separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// float and `CanonicalizationError::SerializationFailed` if JSON
    /// serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value)?;
        let s = serde_jcs::to_string(&coerced)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively reject floats; everything else passes through unchanged.
fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_keys_and_compacts() {
        let data =
            serde_json::json!({"subject_name": "Alice", "claim": "Algorithms101", "sequence": 7});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"claim":"Algorithms101","sequence":7,"subject_name":"Alice"}"#);
    }

    #[test]
    fn nested_objects_are_sorted_too() {
        let data = serde_json::json!({"outer": {"b": 2, "a": 1}, "list": [3, 2, 1]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn float_is_rejected() {
        let data = serde_json::json!({"score": 97.5});
        match CanonicalBytes::new(&data).unwrap_err() {
            CanonicalizationError::FloatRejected(f) => assert_eq!(f, 97.5),
            other => panic!("expected FloatRejected, got: {other}"),
        }
    }

    #[test]
    fn deeply_nested_float_is_rejected() {
        let data = serde_json::json!({"a": {"b": [{"c": 0.25}]}});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn large_sequence_numbers_survive() {
        let data = serde_json::json!({"sequence": u64::MAX});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), format!(r#"{{"sequence":{}}}"#, u64::MAX).as_bytes());
    }

    #[test]
    fn unicode_passes_through_as_utf8() {
        let data = serde_json::json!({"subject_name": "Zoë Ñúñez"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert!(std::str::from_utf8(cb.as_bytes()).unwrap().contains("Zoë Ñúñez"));
    }

    #[test]
    fn from_value_matches_new() {
        let data = serde_json::json!({"b": true, "a": null});
        let a = CanonicalBytes::new(&data).unwrap();
        let b = CanonicalBytes::from_value(data).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
        assert_eq!(a.len(), a.as_bytes().len());
    }
}
