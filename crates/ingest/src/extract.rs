//! Fetches the day's APOD entry from the remote API.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use apod_core::config::SourceConfig;
use apod_core::{IngestError, RawRecord};

use crate::source::{HttpFetcher, HttpResponse};

/// Issues the single GET that produces a run's [`RawRecord`].
pub struct Extractor {
    fetcher: Arc<dyn HttpFetcher>,
    url: String,
    api_key: String,
}

impl Extractor {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, url: String, api_key: String) -> Self {
        Self {
            fetcher,
            url,
            api_key,
        }
    }

    pub fn from_config(fetcher: Arc<dyn HttpFetcher>, config: &SourceConfig) -> Self {
        Self::new(fetcher, config.endpoint_url(), config.api_key.clone())
    }

    /// Fetch today's record. The remote source picks the day.
    ///
    /// The object is returned as received; field checks happen in
    /// [`normalize`](crate::transform::normalize).
    pub async fn fetch_today(&self) -> Result<RawRecord, IngestError> {
        info!(url = %self.url, "fetching APOD record");
        let response = self
            .fetcher
            .get(&self.url, &[("api_key", self.api_key.as_str())])
            .await?;
        parse_response(response)
    }
}

/// Classify an HTTP exchange and decode its body.
///
/// 5xx is transient. Any other non-2xx status, an undecodable body, or a
/// body that is not a JSON object is permanent.
pub fn parse_response(response: HttpResponse) -> Result<RawRecord, IngestError> {
    let HttpResponse { status, body } = response;

    if (500..600).contains(&status) {
        warn!(status, "APOD source returned server error");
        return Err(IngestError::Transient(format!("server error {status}: {body}")));
    }
    if !(200..300).contains(&status) {
        warn!(status, "APOD source rejected request");
        return Err(IngestError::Permanent(format!("request rejected {status}: {body}")));
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => {
            debug!(keys = map.len(), "decoded APOD response");
            Ok(map)
        }
        Ok(other) => Err(IngestError::Permanent(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(IngestError::Permanent(format!("malformed JSON: {e}"))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
