//! In-process table-id cache
//!
//! Holds the cache in a map guarded by a mutex. Entries live as long as the
//! process, so tables are only reused across runs of the same process.

use crate::adapters::traits::TableIdCache;
use crate::domain::{CohortError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Table-id cache kept in memory
#[derive(Debug, Default)]
pub struct InMemoryTableIdCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryTableIdCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-populated with entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TableIdCache for InMemoryTableIdCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| CohortError::Cache(format!("Cache lock poisoned: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    async fn set_if_absent(&self, key: &str, table_id: &str) -> Result<String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CohortError::Cache(format!("Cache lock poisoned: {e}")))?;
        Ok(entries
            .entry(key.to_string())
            .or_insert_with(|| table_id.to_string())
            .clone())
    }
}
