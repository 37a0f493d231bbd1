//! Hashing System - Document Fingerprints
//!
//! SHA-256 over canonical JSON (sorted keys, no whitespace). Two documents
//! with the same content fingerprint render identically.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::document::Document;
use crate::interchange::{self, InterchangeError};

/// Keys dropped for a content fingerprint.
pub const VOLATILE_KEYS: [&str; 2] = ["dateCreated", "dateModified"];

/// Envelope keys that describe the writer, not the document.
const WRITER_KEYS: [&str; 1] = ["generator"];

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Sorted keys, no whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize(&value, &[]))
}

fn canonicalize(value: &Value, skip: &[&str]) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .keys()
                .filter(|k| !skip.contains(&k.as_str()))
                .collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), canonicalize(&map[k], skip)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| canonicalize(v, skip)).collect()),
        other => other.clone(),
    }
}

fn fingerprint(doc: &Document, skip: &[&str]) -> Result<String, InterchangeError> {
    let mut value = interchange::to_value(doc)?;
    if let Value::Object(envelope) = &mut value {
        for key in WRITER_KEYS {
            envelope.remove(key);
        }
    }
    let canonical = serde_json::to_string(&canonicalize(&value, skip))?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hash of the whole interchange tree, timestamps included.
pub fn document_fingerprint(doc: &Document) -> Result<String, InterchangeError> {
    fingerprint(doc, &[])
}

/// Hash with timestamps stripped. Stable across rebuilds of the same content.
pub fn content_fingerprint(doc: &Document) -> Result<String, InterchangeError> {
    fingerprint(doc, &VOLATILE_KEYS)
}
