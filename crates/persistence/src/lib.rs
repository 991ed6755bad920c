//! Call record persistence
//!
//! - [`ScyllaCallStore`]: `call_logs` table in ScyllaDB, `unique_id`
//!   uniqueness enforced with `INSERT ... IF NOT EXISTS`
//! - [`InMemoryCallStore`]: process-local fallback

pub mod call_logs;
pub mod client;
pub mod error;
pub mod memory;
pub mod schema;

pub use call_logs::ScyllaCallStore;
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use memory::InMemoryCallStore;

use std::sync::Arc;

use callbot_config::PersistenceConfig;
use callbot_core::CallRecordStore;

/// Connect to ScyllaDB and make sure the schema exists
pub async fn init(config: ScyllaConfig) -> Result<ScyllaCallStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaCallStore::new(client))
}

/// Store selected by configuration
///
/// Falls back to memory when persistence is disabled or ScyllaDB cannot be
/// reached at startup.
pub async fn open_store(config: &PersistenceConfig) -> Arc<dyn CallRecordStore> {
    if !config.enabled {
        tracing::info!("ScyllaDB persistence disabled, using in-memory call store");
        return Arc::new(InMemoryCallStore::new());
    }

    match init(ScyllaConfig::from(config)).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "ScyllaDB unavailable, using in-memory call store");
            Arc::new(InMemoryCallStore::new())
        },
    }
}
