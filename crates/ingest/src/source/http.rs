use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use apod_core::IngestError;

use super::traits::{HttpFetcher, HttpResponse};

/// [`HttpFetcher`] backed by a pooled reqwest client.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Fails with a permanent error when the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Permanent(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, IngestError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_transport_error)?;

        Ok(HttpResponse { status, body })
    }
}

/// Requests that could not even be built will fail the same way next time;
/// everything else went wrong on the wire.
fn classify_transport_error(e: reqwest::Error) -> IngestError {
    // Strip the URL: it carries the api_key query parameter.
    let e = e.without_url();
    if e.is_builder() {
        IngestError::Permanent(format!("invalid request: {e}"))
    } else if e.is_timeout() {
        IngestError::Transient(format!("request timed out: {e}"))
    } else {
        IngestError::Transient(format!("HTTP request failed: {e}"))
    }
}
