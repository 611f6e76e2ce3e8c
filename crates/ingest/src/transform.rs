//! Normalization from the source's response to [`CanonicalRecord`].
//!
//! This is the only place that knows the source's field names. Missing keys
//! and values of an unexpected shape become empty strings.

use serde_json::Value;

use apod_core::{CanonicalRecord, RawRecord};

/// Map a raw response onto the five persisted fields. Never fails.
pub fn normalize(mut raw: RawRecord) -> CanonicalRecord {
    CanonicalRecord {
        title: take_scalar(&mut raw, "title"),
        explanation: take_scalar(&mut raw, "explanation"),
        url: take_scalar(&mut raw, "url"),
        date: take_scalar(&mut raw, "date"),
        media_type: take_scalar(&mut raw, "media_type"),
    }
}

/// Strings move through untouched; numbers and booleans keep their JSON text.
fn take_scalar(raw: &mut RawRecord, key: &str) -> String {
    match raw.remove(key) {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null | Value::Array(_) | Value::Object(_)) | None => String::new(),
    }
}
