//! Interaction history storage for Synapse.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use synapse_config::StorageConfig;
use synapse_core::error::StoreError;
use synapse_core::interaction::InteractionStore;

pub use in_memory::InMemoryInteractionStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteInteractionStore;

/// Open the store selected by `storage.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn InteractionStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryInteractionStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(
            SqliteInteractionStore::open(&config.database_path()).await?,
        )),
        other => Err(StoreError::Storage(format!(
            "Unknown storage backend: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_by_name() {
        let config = StorageConfig {
            backend: "memory".into(),
            ..StorageConfig::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn sqlite_backend_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: "sqlite".into(),
            path: Some(dir.path().join("synapse.db")),
            auto_save: true,
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(dir.path().join("synapse.db").exists());
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let config = StorageConfig {
            backend: "postgres".into(),
            ..StorageConfig::default()
        };
        assert!(open_store(&config).await.is_err());
    }
}
