//! Record shapes flowing through the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The response object exactly as the remote source returned it.
pub type RawRecord = Map<String, Value>;

/// Normalized APOD entry. Every field is always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub title: String,
    pub explanation: String,
    pub url: String,
    /// Free text from the source; coerced by the sink, not validated here.
    pub date: String,
    pub media_type: String,
}

/// A row of `apod_data` as read back from the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRow {
    pub id: i32,
    #[serde(flatten)]
    pub record: CanonicalRecord,
}
