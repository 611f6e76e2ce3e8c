//! Persists a canonical record and reads back the newest rows.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use apod_core::{CanonicalRecord, IngestError, PersistedRow};

use crate::store::ApodStore;

/// Rows read back after an insert unless configured otherwise.
pub const DEFAULT_VERIFY_LIMIT: u32 = 5;

/// Outcome of a successful [`Loader::load`].
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub row_id: i32,
    /// Newest rows after the insert, for observability only.
    pub recent: Vec<PersistedRow>,
}

pub struct Loader {
    store: Arc<dyn ApodStore>,
    verify_limit: u32,
}

impl Loader {
    pub fn new(store: Arc<dyn ApodStore>) -> Self {
        Self::with_verify_limit(store, DEFAULT_VERIFY_LIMIT)
    }

    pub fn with_verify_limit(store: Arc<dyn ApodStore>, verify_limit: u32) -> Self {
        Self {
            store,
            verify_limit,
        }
    }

    /// Append `record` as a new row, then read back the latest rows.
    ///
    /// An empty readback is logged, never rolled back: once the insert has
    /// returned, the row is committed.
    pub async fn load(&self, record: CanonicalRecord) -> Result<LoadReport, IngestError> {
        let row_id = self.store.insert(&record).await?;
        info!(row_id, date = %record.date, title = %record.title, "inserted APOD row");

        let recent = self.store.latest(self.verify_limit).await?;
        if recent.is_empty() {
            warn!(row_id, "verification read returned no rows");
        } else {
            info!(rows = recent.len(), newest_id = recent[0].id, "rows in apod_data after insert");
            debug!(?recent, "verification read");
        }

        Ok(LoadReport { row_id, recent })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::store::memory::{MemoryStore, StoreOp};

    fn moon() -> CanonicalRecord {
        CanonicalRecord {
            title: "Moon".into(),
            explanation: "A moon.".into(),
            url: "http://x/img.jpg".into(),
            date: "2024-01-01".into(),
            media_type: "image".into(),
        }
    }

    async fn ready_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new(Arc::new(Mutex::new(Vec::new()))));
        store.create_table().await.unwrap();
        store
    }

    #[tokio::test]
    async fn appends_one_row_with_next_id() {
        let store = ready_store().await;
        let loader = Loader::new(store.clone());

        let first = loader.load(moon()).await.unwrap();
        let prior_max = first.row_id;

        let report = loader.load(moon()).await.unwrap();

        assert_eq!(report.row_id, prior_max + 1);
        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, report.row_id);
        assert_eq!(rows[1].record, moon());
    }

    #[tokio::test]
    async fn same_day_is_appended_not_upserted() {
        let store = ready_store().await;
        let loader = Loader::new(store.clone());

        loader.load(moon()).await.unwrap();
        loader.load(moon()).await.unwrap();

        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.record.date == "2024-01-01"));
        assert!(rows[0].id < rows[1].id);
    }

    #[tokio::test]
    async fn readback_is_newest_first_and_limited() {
        let store = ready_store().await;
        let loader = Loader::with_verify_limit(store.clone(), 3);

        let mut last = None;
        for i in 0..5 {
            let mut record = moon();
            record.title = format!("Moon {i}");
            last = Some(loader.load(record).await.unwrap());
        }

        let report = last.unwrap();
        let ids: Vec<i32> = report.recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert_eq!(report.recent[0].record.title, "Moon 4");
    }

    #[tokio::test]
    async fn insert_failure_is_propagated() {
        let store = ready_store().await;
        store.fail_next(
            StoreOp::Insert,
            IngestError::Storage("value too long for type character varying(255)".into()),
        );

        let err = Loader::new(store.clone()).load(moon()).await.unwrap_err();

        assert!(matches!(err, IngestError::Storage(_)));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn readback_failure_fails_load_but_keeps_row() {
        let store = ready_store().await;
        store.fail_next(StoreOp::Latest, IngestError::Storage("connection lost".into()));

        let err = Loader::new(store.clone()).load(moon()).await.unwrap_err();

        assert_eq!(err, IngestError::Storage("connection lost".into()));
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn zero_limit_readback_is_not_an_error() {
        let store = ready_store().await;
        let report = Loader::with_verify_limit(store.clone(), 0)
            .load(moon())
            .await
            .unwrap();

        assert!(report.recent.is_empty());
        assert_eq!(store.rows().len(), 1);
    }
}
