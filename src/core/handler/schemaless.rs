//! Table of records without a schema

use super::health_data::raw_data_column;
use super::{HandlerContext, TableVariant};
use crate::core::task::ExportTask;
use crate::domain::{ColumnModel, ExportRequest, ExportSubtask, Result, StudyId};
use async_trait::async_trait;

/// Table key of a study's schemaless table
pub fn schemaless_table_key(study_id: &StudyId) -> String {
    format!("{study_id}-default")
}

/// Schemaless table of one study, keyed `<study>-default`
///
/// Only the raw data attachment is exported.
#[derive(Debug, Clone)]
pub struct SchemalessVariant {
    table_key: String,
}

impl SchemalessVariant {
    /// Creates the variant for a study
    pub fn new(study_id: &StudyId) -> Self {
        Self {
            table_key: schemaless_table_key(study_id),
        }
    }
}

#[async_trait]
impl TableVariant for SchemalessVariant {
    fn table_key(&self) -> &str {
        &self.table_key
    }

    async fn columns(
        &self,
        _ctx: &HandlerContext,
        _request: &ExportRequest,
    ) -> Result<Vec<ColumnModel>> {
        Ok(vec![raw_data_column()])
    }

    async fn values(
        &self,
        ctx: &HandlerContext,
        _task: &mut ExportTask,
        subtask: &ExportSubtask,
    ) -> Result<Option<Vec<Option<String>>>> {
        Ok(Some(vec![ctx.raw_data_file_handle(subtask).await]))
    }

    async fn after_upload(&self, ctx: &HandlerContext, record_ids: &[String]) {
        ctx.report_exported(&self.table_key, record_ids).await;
    }
}
