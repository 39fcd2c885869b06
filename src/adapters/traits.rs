//! Collaborator traits
//!
//! This module defines the traits that external collaborators must implement
//! to work with Cohort: the table store, the table-id cache and the study
//! directory. Every call is a single bounded operation; retries belong to the
//! implementations.

use crate::domain::{
    ColumnModel, ExportRequest, RecordExporterStatus, Result, SchemaKey, StudyConfig, StudyId,
    UploadSchema,
};
use async_trait::async_trait;
use std::path::Path;

/// Tabular data store that holds the exported tables
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create a table with the given columns and access control
    ///
    /// The data-access team receives read access and the admin principal
    /// receives administrative access.
    ///
    /// # Returns
    ///
    /// Returns the identifier of the new table.
    async fn create_table_with_columns_and_acls(
        &self,
        columns: &[ColumnModel],
        data_access_team_id: i64,
        admin_principal_id: i64,
        project_id: &str,
        table_key: &str,
    ) -> Result<String>;

    /// Fetch the current column descriptors of a table
    async fn get_column_models(&self, table_id: &str) -> Result<Vec<ColumnModel>>;

    /// Add columns to an existing table
    async fn add_columns(&self, table_id: &str, columns: &[ColumnModel]) -> Result<()>;

    /// Bulk-load a staged TSV file (with header) into a table
    ///
    /// # Returns
    ///
    /// Returns the number of rows the store processed.
    async fn upload_tsv_file_to_table(
        &self,
        project_id: &str,
        table_id: &str,
        file: &Path,
    ) -> Result<u64>;

    /// Upload an attachment and return its file handle id
    async fn upload_attachment_to_file_handle(&self, source_ref: &str) -> Result<String>;

    /// Upload a block of text as a file and return its file handle id
    async fn upload_text_to_file_handle(&self, name: &str, text: &str) -> Result<String>;

    /// Fetch the text held under a large text attachment id
    async fn download_large_text_attachment(&self, attachment_id: &str) -> Result<String>;
}

/// Cross-run cache from logical table key to table identifier
#[async_trait]
pub trait TableIdCache: Send + Sync {
    /// Look up the table identifier cached under a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Cache `table_id` under `key` unless the key is already present
    ///
    /// # Returns
    ///
    /// Returns the identifier that is cached after the call: `table_id` if this
    /// call stored it, otherwise the identifier stored by an earlier writer.
    async fn set_if_absent(&self, key: &str, table_id: &str) -> Result<String>;
}

/// Source of study and schema metadata
#[async_trait]
pub trait StudyDirectory: Send + Sync {
    /// Look up a study's configuration
    async fn get_study(&self, study_id: &StudyId) -> Result<StudyConfig>;

    /// Look up an upload schema
    async fn get_schema(&self, request: &ExportRequest, key: &SchemaKey) -> Result<UploadSchema>;

    /// Project that holds the study's tables
    async fn get_project_id_for_study(&self, study_id: &StudyId) -> Result<String> {
        Ok(self.get_study(study_id).await?.project_id)
    }

    /// Team granted read access on the study's tables
    async fn get_data_access_team_id(&self, study_id: &StudyId) -> Result<i64> {
        Ok(self.get_study(study_id).await?.data_access_team_id)
    }

    /// Whether the study's app-version rows are skipped
    async fn is_study_excluded(&self, study_id: &StudyId) -> Result<bool> {
        Ok(self.get_study(study_id).await?.excluded)
    }

    /// Report the export status of uploaded records
    async fn update_record_exporter_status(
        &self,
        record_ids: &[String],
        status: RecordExporterStatus,
    ) -> Result<()>;
}
