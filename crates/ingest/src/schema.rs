use std::sync::Arc;

use tracing::info;

use apod_core::IngestError;

use crate::store::{ApodStore, TABLE_NAME};

/// Makes sure the sink table exists before anything is fetched.
pub struct SchemaInitializer {
    store: Arc<dyn ApodStore>,
}

impl SchemaInitializer {
    pub fn new(store: Arc<dyn ApodStore>) -> Self {
        Self { store }
    }

    /// Safe to call on every run; a no-op once the table exists.
    pub async fn ensure_schema(&self) -> Result<(), IngestError> {
        self.store.create_table().await?;
        info!(table = TABLE_NAME, "sink table ready");
        Ok(())
    }
}
