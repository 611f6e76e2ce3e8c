use async_trait::async_trait;

use apod_core::IngestError;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport used by the extractor.
///
/// Implementations return any response that made it back over the wire,
/// whatever its status. Only failures to complete the exchange are errors:
/// [`IngestError::Transient`] for timeouts and connection failures,
/// [`IngestError::Permanent`] for requests that could not be built.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, IngestError>;
}

/// Scripted fetcher for exercising the pipeline without a network.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Shared, ordered log of calls made against test doubles.
    pub type Journal = Arc<Mutex<Vec<String>>>;

    /// A fetcher that replays queued outcomes in order.
    ///
    /// Each call appends `"fetch"` to the journal and records the query it
    /// received. Once the queue is drained every call fails transiently.
    pub struct ScriptedFetcher {
        outcomes: Mutex<VecDeque<Result<HttpResponse, IngestError>>>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
        journal: Journal,
    }

    impl ScriptedFetcher {
        pub fn new(journal: Journal) -> Self {
            Self {
                outcomes: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                journal,
            }
        }

        pub fn queue(&self, outcome: Result<HttpResponse, IngestError>) {
            self.outcomes.lock().unwrap().push_back(outcome);
        }

        /// Queue a 200 response carrying `body` as JSON.
        pub fn queue_json(&self, body: serde_json::Value) {
            self.queue(Ok(HttpResponse::new(200, body.to_string())));
        }

        /// Every `(url, query)` pair seen so far.
        pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpFetcher for ScriptedFetcher {
        async fn get(
            &self,
            url: &str,
            query: &[(&str, &str)],
        ) -> Result<HttpResponse, IngestError> {
            self.journal.lock().unwrap().push("fetch".to_string());
            self.requests.lock().unwrap().push((
                url.to_string(),
                query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(IngestError::Transient("no scripted response".into())))
        }
    }
}
