//! In-memory [`ApodStore`] that mimics the table's observable behavior.
//!
//! Ids come from a counter that is never rewound, like a `SERIAL` sequence.
//! Writes against a table that was never created fail the way the database
//! would. Every call is appended to a shared journal so tests can assert the
//! order in which the pipeline touched the sink.

use std::sync::Mutex;

use async_trait::async_trait;

use apod_core::{CanonicalRecord, IngestError, PersistedRow};

use super::ApodStore;
use crate::source::traits::mock::Journal;

/// Which store operation a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    CreateTable,
    Insert,
    Latest,
}

impl StoreOp {
    fn label(self) -> &'static str {
        match self {
            Self::CreateTable => "create_table",
            Self::Insert => "insert",
            Self::Latest => "latest",
        }
    }
}

#[derive(Default)]
struct Table {
    exists: bool,
    create_calls: usize,
    last_id: i32,
    rows: Vec<PersistedRow>,
}

pub struct MemoryStore {
    table: Mutex<Table>,
    failures: Mutex<Vec<(StoreOp, IngestError)>>,
    journal: Journal,
}

impl MemoryStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            failures: Mutex::new(Vec::new()),
            journal,
        }
    }

    /// Make the next call to `op` fail with `error`.
    pub fn fail_next(&self, op: StoreOp, error: IngestError) {
        self.failures.lock().unwrap().push((op, error));
    }

    /// Snapshot of all rows in insertion order.
    pub fn rows(&self) -> Vec<PersistedRow> {
        self.table.lock().unwrap().rows.clone()
    }

    pub fn table_exists(&self) -> bool {
        self.table.lock().unwrap().exists
    }

    /// How many times `create_table` ran successfully.
    pub fn create_calls(&self) -> usize {
        self.table.lock().unwrap().create_calls
    }

    fn enter(&self, op: StoreOp) -> Result<(), IngestError> {
        self.journal.lock().unwrap().push(op.label().to_string());
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(o, _)| *o == op) {
            Some(idx) => Err(failures.remove(idx).1),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ApodStore for MemoryStore {
    async fn create_table(&self) -> Result<(), IngestError> {
        self.enter(StoreOp::CreateTable)?;
        let mut table = self.table.lock().unwrap();
        table.exists = true;
        table.create_calls += 1;
        Ok(())
    }

    async fn insert(&self, record: &CanonicalRecord) -> Result<i32, IngestError> {
        self.enter(StoreOp::Insert)?;
        let mut table = self.table.lock().unwrap();
        if !table.exists {
            return Err(IngestError::Storage(
                "relation \"apod_data\" does not exist".into(),
            ));
        }
        table.last_id += 1;
        let id = table.last_id;
        table.rows.push(PersistedRow {
            id,
            record: record.clone(),
        });
        Ok(id)
    }

    async fn latest(&self, limit: u32) -> Result<Vec<PersistedRow>, IngestError> {
        self.enter(StoreOp::Latest)?;
        let table = self.table.lock().unwrap();
        if !table.exists {
            return Err(IngestError::Storage(
                "relation \"apod_data\" does not exist".into(),
            ));
        }
        Ok(table
            .rows
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
