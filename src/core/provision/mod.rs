//! Table provisioning and column reconciliation
//!
//! Maps a logical table key to a table in the store. The table-id cache is the
//! source of truth for that mapping:
//!
//! - cache hit: the table's columns are reconciled with the expected ones.
//!   Missing columns are added; existing columns are never changed or removed.
//! - cache miss: a table is created with every expected column and the
//!   study's access control, then its id is cached with a compare-and-set. A
//!   provisioner that loses the race to another creator adopts the cached id
//!   and reconciles against it; the table it created is left orphaned and
//!   logged.
//!
//! Any store or cache failure fails provisioning. Nothing is cached unless a
//! table was actually created.

use crate::adapters::{TableIdCache, TableStore};
use crate::domain::{ColumnModel, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Where and how a table is provisioned
#[derive(Debug, Clone, Copy)]
pub struct TableSpec<'a> {
    /// Logical table key
    pub table_key: &'a str,
    /// Project that holds the table
    pub project_id: &'a str,
    /// Team granted read access on creation
    pub data_access_team_id: i64,
    /// Expected columns, in row order
    pub columns: &'a [ColumnModel],
}

/// Resolves logical table keys to tables, creating them when needed
#[derive(Clone)]
pub struct TableProvisioner {
    store: Arc<dyn TableStore>,
    cache: Arc<dyn TableIdCache>,
    admin_principal_id: i64,
    cache_key_prefix: String,
}

impl TableProvisioner {
    /// Creates a provisioner
    ///
    /// `cache_key_prefix` namespaces the cache keys of one deployment.
    pub fn new(
        store: Arc<dyn TableStore>,
        cache: Arc<dyn TableIdCache>,
        admin_principal_id: i64,
        cache_key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            admin_principal_id,
            cache_key_prefix: cache_key_prefix.into(),
        }
    }

    /// Cache key of a logical table key
    pub fn cache_key(&self, table_key: &str) -> String {
        format!("{}{}", self.cache_key_prefix, table_key)
    }

    /// Returns the id of the table backing `spec.table_key`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lookup, table creation, column fetch or
    /// column addition fails.
    pub async fn provision(&self, spec: TableSpec<'_>) -> Result<String> {
        let cache_key = self.cache_key(spec.table_key);

        if let Some(table_id) = self.cache.get(&cache_key).await? {
            tracing::debug!(table_key = spec.table_key, %table_id, "Table id cache hit");
            self.reconcile_columns(&table_id, spec.columns).await?;
            return Ok(table_id);
        }

        let created_id = self
            .store
            .create_table_with_columns_and_acls(
                spec.columns,
                spec.data_access_team_id,
                self.admin_principal_id,
                spec.project_id,
                spec.table_key,
            )
            .await?;
        tracing::info!(
            table_key = spec.table_key,
            table_id = %created_id,
            columns = spec.columns.len(),
            "Created table"
        );

        let cached_id = self.cache.set_if_absent(&cache_key, &created_id).await?;
        if cached_id != created_id {
            tracing::warn!(
                table_key = spec.table_key,
                table_id = %cached_id,
                orphaned_table_id = %created_id,
                "Another export created the table first; using the cached table"
            );
            self.reconcile_columns(&cached_id, spec.columns).await?;
        }

        Ok(cached_id)
    }

    /// Adds the expected columns missing from a table
    ///
    /// Columns are matched by name only.
    ///
    /// # Returns
    ///
    /// Returns the columns that were added.
    pub async fn reconcile_columns(
        &self,
        table_id: &str,
        expected: &[ColumnModel],
    ) -> Result<Vec<ColumnModel>> {
        let existing = self.store.get_column_models(table_id).await?;
        let missing = missing_columns(&existing, expected);

        if !missing.is_empty() {
            self.store.add_columns(table_id, &missing).await?;
            tracing::info!(
                table_id,
                added = ?missing.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Added columns to table"
            );
        }

        Ok(missing)
    }
}

/// Expected columns whose names are absent from `existing`, in expected order
pub fn missing_columns(existing: &[ColumnModel], expected: &[ColumnModel]) -> Vec<ColumnModel> {
    let existing_names: HashSet<&str> = existing.iter().map(|c| c.name.as_str()).collect();
    let mut seen = HashSet::new();
    expected
        .iter()
        .filter(|c| !existing_names.contains(c.name.as_str()))
        .filter(|c| seen.insert(c.name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnType;

    #[test]
    fn test_missing_columns_by_name() {
        let existing = vec![
            ColumnModel::string("a", 10),
            ColumnModel::new("b", ColumnType::Integer),
        ];
        let expected = vec![
            ColumnModel::string("a", 99),
            ColumnModel::string("b", 10),
            ColumnModel::new("c", ColumnType::Boolean),
        ];
        assert_eq!(
            missing_columns(&existing, &expected),
            vec![ColumnModel::new("c", ColumnType::Boolean)]
        );
    }

    #[test]
    fn test_missing_columns_none() {
        let columns = vec![ColumnModel::string("a", 10)];
        assert!(missing_columns(&columns, &columns).is_empty());
    }

    #[test]
    fn test_missing_columns_dedupes_expected() {
        let expected = vec![ColumnModel::string("x", 10), ColumnModel::string("x", 10)];
        assert_eq!(missing_columns(&[], &expected).len(), 1);
    }
}
