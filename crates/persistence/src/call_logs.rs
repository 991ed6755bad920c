//! Call record persistence using ScyllaDB

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::frame::response::result::{CqlValue, Row};
use scylla::frame::value::CqlTimestamp;
use scylla::QueryResult;
use std::path::PathBuf;

use callbot_core::{CallRecord, CallRecordStore, NewCallRecord, QualityScore};

use crate::{PersistenceError, ScyllaClient};

/// Days of history a recent-calls listing walks back through
///
/// `call_logs` is partitioned by `unique_id`, so listings read the
/// `call_logs_by_day` index instead, one UTC day partition at a time.
const LIST_LOOKBACK_DAYS: i64 = 31;

const COLUMNS: &str = "unique_id, sentiment, intent, transcript, reply_text, \
                       processing_time, audio_response_path, quality_score, created_at";

/// ScyllaDB implementation of the call record store
#[derive(Clone)]
pub struct ScyllaCallStore {
    client: ScyllaClient,
}

impl ScyllaCallStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn insert_record(&self, record: NewCallRecord) -> Result<CallRecord, PersistenceError> {
        let created_at = Utc::now();
        let query = format!(
            "INSERT INTO {}.call_logs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
            self.client.keyspace(),
            COLUMNS
        );

        let audio_path = record
            .reply_audio_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    &record.unique_id,
                    record.sentiment.as_str(),
                    record.intent.as_str(),
                    &record.transcript,
                    &record.reply_text,
                    record.processing_time_seconds,
                    &audio_path,
                    record.quality_score.value() as i32,
                    CqlTimestamp(created_at.timestamp_millis()),
                ),
            )
            .await?;

        if !lwt_applied(&result) {
            return Err(PersistenceError::Duplicate(record.unique_id));
        }

        if let Err(e) = self.index_record(&record.unique_id, created_at).await {
            tracing::warn!(
                unique_id = %record.unique_id,
                error = %e,
                "Call record stored but missing from the listing index"
            );
        }

        tracing::info!(unique_id = %record.unique_id, "Call record stored in ScyllaDB");

        // the stored timestamp has millisecond precision
        let created_at = DateTime::from_timestamp_millis(created_at.timestamp_millis())
            .unwrap_or(created_at);
        Ok(record.into_record(created_at))
    }

    async fn get_record(&self, unique_id: &str) -> Result<Option<CallRecord>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM {}.call_logs WHERE unique_id = ?",
            COLUMNS,
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (unique_id,))
            .await?;

        match result.rows.and_then(|rows| rows.into_iter().next()) {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    async fn index_record(
        &self,
        unique_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.call_logs_by_day (day, created_at, unique_id) VALUES (?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    day_bucket(created_at),
                    CqlTimestamp(created_at.timestamp_millis()),
                    unique_id,
                ),
            )
            .await?;
        Ok(())
    }

    /// Newest calls first, from the last [`LIST_LOOKBACK_DAYS`] days
    async fn list_records(&self, limit: usize) -> Result<Vec<CallRecord>, PersistenceError> {
        let query = format!(
            "SELECT unique_id FROM {}.call_logs_by_day WHERE day = ? LIMIT ?",
            self.client.keyspace()
        );

        let mut ids: Vec<String> = Vec::new();
        for day in recent_days(Utc::now(), LIST_LOOKBACK_DAYS) {
            if ids.len() >= limit {
                break;
            }
            let remaining = i32::try_from(limit - ids.len()).unwrap_or(i32::MAX);
            let result = self
                .client
                .session()
                .query_unpaged(query.clone(), (day, remaining))
                .await?;
            for row in result.rows.unwrap_or_default() {
                let (unique_id,): (String,) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                ids.push(unique_id);
            }
        }

        let mut records = Vec::with_capacity(ids.len());
        for unique_id in ids {
            match self.get_record(&unique_id).await? {
                Some(record) => records.push(record),
                None => tracing::warn!(unique_id = %unique_id, "Indexed call has no record"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl CallRecordStore for ScyllaCallStore {
    async fn insert(&self, record: NewCallRecord) -> callbot_core::Result<CallRecord> {
        Ok(self.insert_record(record).await?)
    }

    async fn get(&self, unique_id: &str) -> callbot_core::Result<Option<CallRecord>> {
        Ok(self.get_record(unique_id).await?)
    }

    async fn list_recent(&self, limit: usize) -> callbot_core::Result<Vec<CallRecord>> {
        Ok(self.list_records(limit).await?)
    }
}

/// Whether a conditional statement was applied
///
/// A missing result row means the statement was not conditional.
fn lwt_applied(result: &QueryResult) -> bool {
    result
        .rows
        .as_ref()
        .and_then(|rows| rows.first())
        .and_then(|row| row.columns.first())
        .map(|applied| matches!(applied, Some(CqlValue::Boolean(true))))
        .unwrap_or(true)
}

/// UTC day partition key of a call
fn day_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Day partitions from `now` backwards
fn recent_days(now: DateTime<Utc>, days: i64) -> impl Iterator<Item = String> {
    (0..days).map(move |back| day_bucket(now - chrono::Duration::days(back)))
}

fn row_to_record(row: Row) -> Result<CallRecord, PersistenceError> {
    let (
        unique_id,
        sentiment,
        intent,
        transcript,
        reply_text,
        processing_time,
        audio_response_path,
        quality_score,
        created_at,
    ): (
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<f64>,
        Option<String>,
        Option<i32>,
        Option<CqlTimestamp>,
    ) = row
        .into_typed()
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    Ok(CallRecord {
        sentiment: sentiment
            .parse()
            .map_err(|e: callbot_core::Error| PersistenceError::InvalidData(e.to_string()))?,
        intent: intent
            .parse()
            .map_err(|e: callbot_core::Error| PersistenceError::InvalidData(e.to_string()))?,
        transcript: transcript.unwrap_or_default(),
        reply_text: reply_text.unwrap_or_default(),
        processing_time_seconds: processing_time.unwrap_or_default(),
        reply_audio_path: audio_response_path
            .filter(|p| !p.is_empty())
            .map(PathBuf::from),
        quality_score: QualityScore::from_stored(quality_score.unwrap_or_default()),
        created_at: created_at
            .and_then(|ts| DateTime::from_timestamp_millis(ts.0))
            .unwrap_or_default(),
        unique_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_bucket_is_utc_date() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(day_bucket(at), "2026-03-09");
    }

    #[test]
    fn test_recent_days_walk_back_newest_first() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 30, 0).unwrap();
        let days: Vec<String> = recent_days(now, 3).collect();
        assert_eq!(days, vec!["2026-03-01", "2026-02-28", "2026-02-27"]);
        assert_eq!(recent_days(now, LIST_LOOKBACK_DAYS).count(), 31);
    }
}
