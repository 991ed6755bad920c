//! Call record store trait

use async_trait::async_trait;
use std::path::PathBuf;

use crate::{CallRecord, NewCallRecord, Result};

/// Append-only call record storage
///
/// Records are never updated or deleted through this interface.
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Persist a record; fails with `Error::DuplicateRecord` if the
    /// `unique_id` already exists
    async fn insert(&self, record: NewCallRecord) -> Result<CallRecord>;

    async fn get(&self, unique_id: &str) -> Result<Option<CallRecord>>;

    /// Most recent records first
    async fn list_recent(&self, limit: usize) -> Result<Vec<CallRecord>>;

    /// Path of the synthesized reply audio, if one was stored
    async fn audio_path(&self, unique_id: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .get(unique_id)
            .await?
            .and_then(|record| record.reply_audio_path))
    }
}
