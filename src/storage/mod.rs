pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult, UrlStore, VisitStore};

use crate::config::{DatabaseBackend, DatabaseConfig};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Connect to the configured backend and make sure its schema exists
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let storage: Arc<dyn Storage> = match config.backend {
        DatabaseBackend::Sqlite => {
            tracing::info!("Using SQLite storage: {}", config.url);
            Arc::new(
                SqliteStorage::new(&config.url, config.max_connections)
                    .await?
                    .with_timeout(timeout),
            )
        }
        DatabaseBackend::Postgres => {
            tracing::info!("Using PostgreSQL storage");
            Arc::new(
                PostgresStorage::new(&config.url, config.max_connections)
                    .await?
                    .with_timeout(timeout),
            )
        }
    };

    storage.init().await?;
    Ok(storage)
}
