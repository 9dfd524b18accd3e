//! Descriptor Fingerprints - SHA-256 over canonical JSON
//!
//! The same descriptor always hashes the same, whatever its key order
//! or whitespace.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Serialize with object keys in byte order at every depth and no whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let ordered = with_sorted_keys(serde_json::to_value(value)?);
    serde_json::to_string(&ordered)
}

fn with_sorted_keys(value: Value) -> Value {
    match value {
        Value::Object(fields) => {
            let by_key: BTreeMap<String, Value> = fields
                .into_iter()
                .map(|(key, nested)| (key, with_sorted_keys(nested)))
                .collect();
            Value::Object(by_key.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(with_sorted_keys).collect()),
        scalar => scalar,
    }
}

/// Fingerprint of a raw descriptor document.
pub fn descriptor_hash(raw: &Map<String, Value>) -> Result<String, serde_json::Error> {
    canonical_json(raw).map(|canonical| sha256_hex(canonical.as_bytes()))
}
