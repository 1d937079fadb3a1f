use crate::config::{StorageBackend, StorageConfig};
use crate::error::{AppError, Result};
use crate::state::document::FieldPath;
use crate::state::{DocumentStore, SledStore};
use std::sync::Arc;

/// Create a document store based on configuration.
///
/// When `create_text_index` is set the configured collection gets its text
/// index before the store is handed out.
pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StorageBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;
            let index_path = config.resolved_index_path().ok_or_else(|| {
                AppError::Configuration(
                    "Sled backend requires 'index_path' configuration".to_string(),
                )
            })?;

            tracing::info!(path = ?path, index_path = ?index_path, "Initializing Sled storage backend");

            Arc::new(SledStore::new(path, index_path, config.writer_heap_size)?)
        }

        StorageBackend::Memory => {
            tracing::info!("Initializing in-memory storage backend");
            Arc::new(SledStore::temporary(config.writer_heap_size)?)
        }
    };

    if config.create_text_index {
        let fields: Vec<FieldPath> = config
            .text_index_fields
            .iter()
            .map(|f| FieldPath::new(f.as_str()))
            .collect();

        if fields.is_empty() {
            return Err(AppError::Configuration(
                "create_text_index requires at least one text_index_fields entry".to_string(),
            ));
        }

        store.create_text_index(&config.collection, &fields).await?;
    }

    Ok(store)
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store(writer_heap_size: usize) -> Result<Arc<dyn DocumentStore>> {
    tracing::info!("Initializing in-memory storage backend");
    Ok(Arc::new(SledStore::temporary(writer_heap_size)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Filter, TextQuery};
    use tempfile::TempDir;

    fn text_query() -> TextQuery {
        TextQuery {
            text: "rust".to_string(),
            filter: Filter::All,
            limit: 10,
        }
    }

    #[tokio::test]
    async fn test_create_sled_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sled,
            path: Some(temp_dir.path().join("db")),
            ..Default::default()
        };

        let store = create_store(&config).await.unwrap();
        // Index exists, so an empty collection searches cleanly
        let outcome = store.text_search("documentation", &text_query()).await.unwrap();
        assert_eq!(outcome.total, 0);
        assert!(temp_dir.path().join("db").join("text_index").join("documentation").exists());
    }

    #[tokio::test]
    async fn test_reopen_sled_store_with_index() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sled,
            path: Some(temp_dir.path().join("db")),
            ..Default::default()
        };

        {
            let store = create_store(&config).await.unwrap();
            let mut document = crate::state::Document::new();
            document.insert("technology".to_string(), "rust".into());
            store
                .insert_one("documentation", &crate::models::RecordId::new(), &document)
                .await
                .unwrap();
            store.close().await.unwrap();
        }

        let store = create_store(&config).await.unwrap();
        let outcome = store.text_search("documentation", &text_query()).await.unwrap();
        assert_eq!(outcome.total, 1);
    }

    #[tokio::test]
    async fn test_create_memory_store_without_index() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            create_text_index: false,
            ..Default::default()
        };

        let store = create_store(&config).await.unwrap();
        let err = store.text_search("documentation", &text_query()).await.unwrap_err();
        assert!(err.is_missing_index());
    }

    #[tokio::test]
    async fn test_create_in_memory_store() {
        let store = create_in_memory_store(50_000_000).unwrap();
        assert!(store.find("documentation", &Filter::All, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sled_requires_path() {
        let config = StorageConfig {
            backend: StorageBackend::Sled,
            path: None,
            ..Default::default()
        };

        let result = create_store(&config).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
