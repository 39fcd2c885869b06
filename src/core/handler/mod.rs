//! Export handlers
//!
//! An [`ExportHandler`] turns the subtasks of one logical table into rows of a
//! staged TSV file and commits that file to the table store at the end of the
//! run. Every handler shares the same pipeline; what differs between table
//! kinds is captured by a [`TableVariant`], which only supplies the table key,
//! the table-specific columns and the table-specific values of one subtask.
//!
//! Row layout: common columns first (see [`CommonColumns`]), then the
//! variant's columns.
//!
//! # Variants
//!
//! - [`SingleFieldVariant`] - one column copied from one record field
//! - [`AppVersionVariant`] - one row per record naming the table it belongs to
//! - [`HealthDataVariant`] - fields bound at construction
//! - [`SchemaBasedVariant`] - fields looked up from the record's schema
//! - [`SchemalessVariant`] - only the raw data attachment

pub mod app_version;
pub mod generic;
pub mod health_data;
pub mod schema_based;
pub mod schemaless;

pub use app_version::{
    app_version_table_key, unique_app_versions_key, AppVersionVariant, COLUMN_ORIGINAL_TABLE, DEFAULT_TABLE_NAME,
};
pub use generic::SingleFieldVariant;
pub use health_data::{raw_data_column, HealthDataVariant, COLUMN_RAW_DATA};
pub use schema_based::SchemaBasedVariant;
pub use schemaless::{schemaless_table_key, SchemalessVariant};

use crate::adapters::{StudyDirectory, TableStore};
use crate::core::provision::{TableProvisioner, TableSpec};
use crate::core::row::CommonColumns;
use crate::core::serialize::FieldSerializer;
use crate::core::task::{
    table_counter, ExportTask, ERROR_COUNT_SUFFIX, LINE_COUNT_SUFFIX, UPLOADED_ROWS_SUFFIX,
};
use crate::core::tsv::TsvInfo;
use crate::domain::{
    column_names, CohortError, ColumnModel, ExportRequest, ExportSubtask, RecordExporterStatus,
    Result, StudyId,
};
use crate::{log_record_error, log_table_commit};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Collaborators shared by every handler of a run
pub struct HandlerContext {
    /// Study and schema metadata
    pub directory: Arc<dyn StudyDirectory>,
    /// Table store receiving uploads
    pub store: Arc<dyn TableStore>,
    /// Resolves table keys to tables
    pub provisioner: TableProvisioner,
    /// Encodes schema fields
    pub serializer: FieldSerializer,
    /// Columns leading every row
    pub common_columns: CommonColumns,
    /// Stage rows but skip every table-store write
    pub dry_run: bool,
}

impl HandlerContext {
    /// Uploads the record's raw data attachment, if it has one
    ///
    /// Upload failures degrade to an empty value.
    pub async fn raw_data_file_handle(&self, subtask: &ExportSubtask) -> Option<String> {
        let attachment_id = subtask.attributes.raw_data_attachment_id()?;
        match self.store.upload_attachment_to_file_handle(attachment_id).await {
            Ok(file_handle_id) => Some(file_handle_id),
            Err(e) => {
                crate::log_field_degraded!(COLUMN_RAW_DATA, format!("raw data upload failed: {e}"));
                None
            }
        }
    }

    /// Reports uploaded records as exported
    ///
    /// A failure is logged and otherwise ignored.
    pub async fn report_exported(&self, table_key: &str, record_ids: &[String]) {
        if let Err(e) = self
            .directory
            .update_record_exporter_status(record_ids, RecordExporterStatus::Succeeded)
            .await
        {
            tracing::warn!(
                table_key,
                records = record_ids.len(),
                error = %e,
                "Failed to update record exporter status"
            );
        }
    }
}

/// What distinguishes one kind of table from another
#[async_trait]
pub trait TableVariant: Send + Sync {
    /// Logical table key
    fn table_key(&self) -> &str;

    /// Table-specific columns, in row order
    async fn columns(&self, ctx: &HandlerContext, request: &ExportRequest)
        -> Result<Vec<ColumnModel>>;

    /// Table-specific values of one subtask, one per column
    ///
    /// Returns `None` when the subtask produces no row for this table.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::RecordContent`] when the record payload cannot be
    /// parsed.
    async fn values(
        &self,
        ctx: &HandlerContext,
        task: &mut ExportTask,
        subtask: &ExportSubtask,
    ) -> Result<Option<Vec<Option<String>>>>;

    /// Called after the table's rows were uploaded
    async fn after_upload(&self, _ctx: &HandlerContext, _record_ids: &[String]) {}
}

/// Result of committing one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Logical table key
    pub table_key: String,
    /// Table the rows went to; `None` on a dry run
    pub table_id: Option<String>,
    /// Rows staged in the run
    pub line_count: usize,
    /// Record ids of the staged rows, in order
    pub record_ids: Vec<String>,
    /// Rows the table store reported processing
    pub uploaded_rows: u64,
}

/// Stages and commits the rows of one logical table
pub struct ExportHandler {
    context: Arc<HandlerContext>,
    study_id: StudyId,
    variant: Box<dyn TableVariant>,
    columns: OnceCell<Vec<ColumnModel>>,
}

impl ExportHandler {
    /// Creates a handler for one study and table kind
    pub fn new(
        context: Arc<HandlerContext>,
        study_id: StudyId,
        variant: impl TableVariant + 'static,
    ) -> Self {
        Self {
            context,
            study_id,
            variant: Box::new(variant),
            columns: OnceCell::new(),
        }
    }

    /// Logical table key
    pub fn table_key(&self) -> &str {
        self.variant.table_key()
    }

    /// Study the handler exports for
    pub fn study_id(&self) -> &StudyId {
        &self.study_id
    }

    /// Every column of the table: common columns then the variant's
    ///
    /// Resolved on first use and kept for the handler's lifetime.
    pub async fn columns(&self, request: &ExportRequest) -> Result<&[ColumnModel]> {
        let columns = self
            .columns
            .get_or_try_init(|| async {
                let mut columns = self.context.common_columns.columns();
                columns.extend(self.variant.columns(&self.context, request).await?);
                Ok::<_, CohortError>(columns)
            })
            .await?;
        Ok(columns)
    }

    /// Writes the row of one subtask
    ///
    /// On success the table's line count is incremented. On failure the error
    /// count is incremented instead, nothing is written and the error is
    /// returned; the task stays usable for the next subtask.
    pub async fn handle(&self, task: &mut ExportTask, subtask: &ExportSubtask) -> Result<()> {
        match self.write_row(task, subtask).await {
            Ok(()) => Ok(()),
            Err(e) => {
                task.metrics_mut()
                    .increment_counter(&table_counter(self.table_key(), ERROR_COUNT_SUFFIX));
                log_record_error!(self.table_key(), subtask.record_id(), e);
                Err(e)
            }
        }
    }

    async fn write_row(&self, task: &mut ExportTask, subtask: &ExportSubtask) -> Result<()> {
        let table_key = self.table_key();
        let Some(variant_values) = self.variant.values(&self.context, task, subtask).await? else {
            tracing::debug!(table_key, record_id = subtask.record_id(), "Record skipped");
            return Ok(());
        };

        let mut row = self
            .context
            .common_columns
            .values(subtask, task.exporter_date());
        row.extend(variant_values);

        if task.tsv_info(table_key).is_none() {
            let columns = self.columns(task.request()).await?;
            let tsv_info = TsvInfo::create(task.scratch_dir(), table_key, column_names(columns))?;
            task.insert_tsv_info(table_key, tsv_info);
        }
        let tsv_info = task
            .tsv_info_mut(table_key)
            .ok_or_else(|| CohortError::Other(format!("No staged file for {table_key}")))?;
        tsv_info.write_row(&row, subtask.record_id())?;

        task.metrics_mut()
            .increment_counter(&table_counter(table_key, LINE_COUNT_SUFFIX));
        tracing::debug!(table_key, record_id = subtask.record_id(), "Row staged");
        Ok(())
    }

    /// Commits the table's staged rows
    ///
    /// Does nothing when the table received no rows this run. Otherwise the
    /// table is provisioned and the staged file uploaded. The staged file is
    /// released on every path.
    ///
    /// # Returns
    ///
    /// Returns `None` when there was nothing to commit.
    ///
    /// # Errors
    ///
    /// Returns an error if provisioning or the upload fails.
    pub async fn upload_to_table_for_task(
        &self,
        task: &mut ExportTask,
    ) -> Result<Option<CommitOutcome>> {
        let Some(mut tsv_info) = task.take_tsv_info(self.table_key()) else {
            tracing::debug!(table_key = self.table_key(), "No rows to upload");
            return Ok(None);
        };

        let committed = self.commit(task, &mut tsv_info).await;
        let released = tsv_info.release();

        let outcome = committed?;
        released?;
        Ok(outcome)
    }

    async fn commit(
        &self,
        task: &mut ExportTask,
        tsv_info: &mut TsvInfo,
    ) -> Result<Option<CommitOutcome>> {
        let table_key = self.table_key();
        if tsv_info.line_count() == 0 {
            return Ok(None);
        }
        tsv_info.flush()?;

        let mut outcome = CommitOutcome {
            table_key: table_key.to_string(),
            table_id: None,
            line_count: tsv_info.line_count(),
            record_ids: tsv_info.record_ids().to_vec(),
            uploaded_rows: 0,
        };

        if self.context.dry_run {
            tracing::info!(
                table_key,
                rows = outcome.line_count,
                path = %tsv_info.path().display(),
                "Dry run, skipping upload"
            );
            return Ok(Some(outcome));
        }

        let directory = &self.context.directory;
        let project_id = directory.get_project_id_for_study(&self.study_id).await?;
        let data_access_team_id = directory.get_data_access_team_id(&self.study_id).await?;
        let columns = self.columns(task.request()).await?;

        let table_id = self
            .context
            .provisioner
            .provision(TableSpec {
                table_key,
                project_id: &project_id,
                data_access_team_id,
                columns,
            })
            .await?;

        let uploaded_rows = self
            .context
            .store
            .upload_tsv_file_to_table(&project_id, &table_id, tsv_info.path())
            .await?;
        task.metrics_mut()
            .add_to_counter(&table_counter(table_key, UPLOADED_ROWS_SUFFIX), uploaded_rows);
        log_table_commit!(table_key, table_id, uploaded_rows);

        self.variant
            .after_upload(&self.context, tsv_info.record_ids())
            .await;

        outcome.table_id = Some(table_id);
        outcome.uploaded_rows = uploaded_rows;
        Ok(Some(outcome))
    }
}
