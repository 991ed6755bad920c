//! ScyllaDB schema creation

use scylla::Session;

use crate::error::PersistenceError;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create the call log tables
///
/// `call_logs` holds one partition per call; `unique_id` uniqueness is
/// enforced with lightweight transactions on insert. `call_logs_by_day`
/// indexes calls by UTC day for recent-first listing.
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let call_logs_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.call_logs (
            unique_id TEXT,
            sentiment TEXT,
            intent TEXT,
            transcript TEXT,
            reply_text TEXT,
            processing_time DOUBLE,
            audio_response_path TEXT,
            quality_score INT,
            created_at TIMESTAMP,
            PRIMARY KEY (unique_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(call_logs_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create call_logs table: {}", e))
        })?;

    // listing index: newest first within a UTC day
    let by_day_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.call_logs_by_day (
            day TEXT,
            created_at TIMESTAMP,
            unique_id TEXT,
            PRIMARY KEY ((day), created_at, unique_id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, unique_id ASC)
    "#,
        keyspace
    );

    session
        .query_unpaged(by_day_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create call_logs_by_day table: {}", e))
        })?;

    tracing::info!("All tables created successfully");
    Ok(())
}
