//! Sink access for the `apod_data` table.
//!
//! [`ApodStore`] is the seam between the pipeline stages and the database
//! driver. [`PgStore`] talks to PostgreSQL through sqlx; the in-memory
//! variant backs the tests.

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use apod_core::{CanonicalRecord, IngestError, PersistedRow};

pub use postgres::PgStore;

/// Target relation for every run.
pub const TABLE_NAME: &str = "apod_data";

/// Storage operations the pipeline needs from the sink.
#[async_trait]
pub trait ApodStore: Send + Sync {
    /// Create `apod_data` unless it already exists. Must be idempotent.
    async fn create_table(&self) -> Result<(), IngestError>;

    /// Append one row and return its generated id.
    async fn insert(&self, record: &CanonicalRecord) -> Result<i32, IngestError>;

    /// Most recent rows, newest first.
    async fn latest(&self, limit: u32) -> Result<Vec<PersistedRow>, IngestError>;
}
