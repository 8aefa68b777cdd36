//! # Canonical Serialization
//!
//! This module defines [`CanonicalBytes`], the sole construction path for
//! bytes fed into the verification hash. The Caller hashes exactly these
//! bytes before publishing, and the Issuer hashes them again on receipt, so
//! a single differing byte means a failed exchange.
//!
//! ## Rules
//!
//! 1. Reject floats. Every protocol number is an integer.
//! 2. Sort object keys by ordinal (byte) order, recursively.
//! 3. Use compact separators (no whitespace).
//! 4. Emit UTF-8 without a byte-order mark, leaving non-ASCII characters
//!    unescaped.
//!
//! Key order on input never matters; key order on output always does.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by canonical JSON serialization.
///
/// The inner `Vec<u8>` is private. Downstream code cannot construct
/// `CanonicalBytes` except through [`CanonicalBytes::new()`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let coerced = coerce_json_value(value)?;
        Ok(Self(serde_json::to_vec(&coerced)?))
    }

    /// Canonicalize an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value)?;
        Ok(Self(serde_json::to_vec(&coerced)?))
    }

    /// Access the canonical bytes for hashing.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// View the canonical form as text. Canonical bytes are always UTF-8.
    pub fn as_str(&self) -> &str {
        // serde_json only ever writes valid UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively reject floats and rebuild objects with sorted keys.
///
/// Keys are re-inserted in sorted order so the output is ordered whether or
/// not `serde_json` was built with `preserve_order`.
fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                return Err(CanonicalizationError::FloatRejected(
                    n.as_f64().unwrap_or(f64::NAN),
                ));
            }
            Ok(Value::Number(n))
        }
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            let mut coerced = serde_json::Map::new();
            for (k, v) in entries {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_and_compact() {
        let cb = CanonicalBytes::new(&json!({"b": 2, "a": 1, "c": {"z": true, "y": null}})).unwrap();
        assert_eq!(cb.as_str(), r#"{"a":1,"b":2,"c":{"y":null,"z":true}}"#);
    }

    #[test]
    fn sorting_is_ordinal_not_case_folded() {
        let cb = CanonicalBytes::new(&json!({"a": 1, "B": 2, "Now": 3})).unwrap();
        assert_eq!(cb.as_str(), r#"{"B":2,"Now":3,"a":1}"#);
    }

    #[test]
    fn floats_are_rejected() {
        let err = CanonicalBytes::new(&json!({"Rounds": 1.5})).unwrap_err();
        assert!(matches!(err, CanonicalizationError::FloatRejected(_)));
    }

    #[test]
    fn nested_floats_are_rejected() {
        assert!(CanonicalBytes::new(&json!({"a": [1, 2.25]})).is_err());
    }

    #[test]
    fn non_ascii_is_not_escaped() {
        let cb = CanonicalBytes::new(&json!({"k": "caf\u{e9} \u{1f989}"})).unwrap();
        assert_eq!(cb.as_bytes(), "{\"k\":\"caf\u{e9} \u{1f989}\"}".as_bytes());
        assert_ne!(cb.as_bytes().first(), Some(&0xEF), "no byte-order mark");
    }

    #[test]
    fn slashes_are_not_escaped() {
        let cb = CanonicalBytes::new(&json!({"u": "https://a.example/x/y"})).unwrap();
        assert_eq!(cb.as_str(), r#"{"u":"https://a.example/x/y"}"#);
    }

    #[test]
    fn negative_and_large_integers_survive() {
        let cb = CanonicalBytes::new(&json!({"n": -5, "m": 5_000_000_000_i64})).unwrap();
        assert_eq!(cb.as_str(), r#"{"m":5000000000,"n":-5}"#);
    }

    #[test]
    fn from_value_matches_new() {
        let v = json!({"y": "1", "x": "2"});
        assert_eq!(
            CanonicalBytes::from_value(v.clone()).unwrap(),
            CanonicalBytes::new(&v).unwrap()
        );
    }
}
