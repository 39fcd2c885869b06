//! PostgreSQL-backed table-id cache

use super::client::PostgreSQLClient;
use crate::adapters::traits::TableIdCache;
use crate::domain::{CohortError, Result};
use async_trait::async_trait;
use std::sync::Arc;

const SELECT_TABLE_ID: &str = "SELECT table_id FROM table_id_cache WHERE cache_key = $1";

const INSERT_TABLE_ID: &str =
    "INSERT INTO table_id_cache (cache_key, table_id) VALUES ($1, $2) ON CONFLICT (cache_key) DO NOTHING";

/// Table-id cache stored in PostgreSQL
///
/// `set_if_absent` relies on the primary key of `table_id_cache`: the first
/// insert for a key wins and every caller reads back the winner.
pub struct PostgresTableIdCache {
    client: Arc<PostgreSQLClient>,
}

impl PostgresTableIdCache {
    /// Create a new cache over a client
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl TableIdCache for PostgresTableIdCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let rows = self.client.query(SELECT_TABLE_ID, &[&key]).await?;
        Ok(rows.first().map(|row| row.get::<_, String>(0)))
    }

    async fn set_if_absent(&self, key: &str, table_id: &str) -> Result<String> {
        let inserted = self
            .client
            .execute(INSERT_TABLE_ID, &[&key, &table_id])
            .await?;
        if inserted == 1 {
            return Ok(table_id.to_string());
        }

        self.get(key).await?.ok_or_else(|| {
            CohortError::Cache(format!("Cache entry for {key} vanished after conflict"))
        })
    }
}
