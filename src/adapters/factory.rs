//! Collaborator factory
//!
//! This module provides factory functions to create collaborators based on configuration.

use crate::adapters::local::{FileStudyDirectory, LocalTableStore};
use crate::adapters::memory::InMemoryTableIdCache;
use crate::adapters::postgresql::{PostgreSQLClient, PostgresTableIdCache};
use crate::adapters::traits::{StudyDirectory, TableIdCache, TableStore};
use crate::config::schema::{CacheBackend, CacheConfig, CohortConfig};
use crate::domain::{CohortError, Result};
use std::sync::Arc;

/// Create the table-id cache selected by `cache.backend`
///
/// The PostgreSQL cache is connected and its schema created before it is
/// returned.
///
/// # Errors
///
/// Returns an error if the PostgreSQL cache cannot be reached or initialized.
pub async fn create_table_id_cache(config: &CacheConfig) -> Result<Arc<dyn TableIdCache>> {
    match config.backend {
        CacheBackend::Memory => {
            tracing::info!("Using in-memory table-id cache");
            Ok(Arc::new(InMemoryTableIdCache::new()))
        }
        CacheBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                CohortError::Configuration(
                    "cache.postgresql configuration is required when cache.backend = 'postgresql'"
                        .to_string(),
                )
            })?;

            let client = PostgreSQLClient::new(pg_config.clone())?;
            tracing::info!(
                server = %client.connection_string_safe(),
                "Using PostgreSQL table-id cache"
            );
            client.test_connection().await?;
            client.ensure_schema().await?;

            Ok(Arc::new(PostgresTableIdCache::new(client)))
        }
    }
}

/// Create the table store under `table_store.root_path`
pub fn create_table_store(config: &CohortConfig) -> Arc<dyn TableStore> {
    Arc::new(LocalTableStore::new(
        &config.table_store.root_path,
        &config.table_store.attachments_path,
    ))
}

/// Create the study directory from `catalog.path`
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn create_study_directory(config: &CohortConfig) -> Result<Arc<dyn StudyDirectory>> {
    Ok(Arc::new(FileStudyDirectory::load(&config.catalog.path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = create_table_id_cache(&CacheConfig::default()).await.unwrap();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_postgresql_requires_section() {
        let config = CacheConfig {
            backend: CacheBackend::PostgreSQL,
            ..CacheConfig::default()
        };
        let result = create_table_id_cache(&config).await;
        assert!(matches!(result, Err(CohortError::Configuration(_))));
    }
}
