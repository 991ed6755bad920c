//! In-memory call record store
//!
//! Used when ScyllaDB is disabled or unreachable, and in tests. Contents are
//! lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use callbot_core::{CallRecord, CallRecordStore, NewCallRecord};

use crate::PersistenceError;

#[derive(Default)]
struct Inner {
    /// Insertion order
    records: Vec<CallRecord>,
    index: HashMap<String, usize>,
}

#[derive(Default)]
pub struct InMemoryCallStore {
    inner: RwLock<Inner>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CallRecordStore for InMemoryCallStore {
    async fn insert(&self, record: NewCallRecord) -> callbot_core::Result<CallRecord> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&record.unique_id) {
            return Err(PersistenceError::Duplicate(record.unique_id).into());
        }

        let record = record.into_record(Utc::now());
        let position = inner.records.len();
        inner.index.insert(record.unique_id.clone(), position);
        inner.records.push(record.clone());

        tracing::debug!(unique_id = %record.unique_id, "Call record stored in memory");
        Ok(record)
    }

    async fn get(&self, unique_id: &str) -> callbot_core::Result<Option<CallRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .index
            .get(unique_id)
            .and_then(|&i| inner.records.get(i))
            .cloned())
    }

    async fn list_recent(&self, limit: usize) -> callbot_core::Result<Vec<CallRecord>> {
        Ok(self
            .inner
            .read()
            .records
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
