//! Health-data tables with a fixed field list

use super::{HandlerContext, TableVariant};
use crate::core::serialize::columns_for_fields;
use crate::core::task::ExportTask;
use crate::domain::{
    ColumnModel, ColumnType, ExportRequest, ExportSubtask, FieldDefinition, Result,
};
use async_trait::async_trait;

/// Column holding the file handle of the record's raw data attachment
pub const COLUMN_RAW_DATA: &str = "rawData";

/// Column model of [`COLUMN_RAW_DATA`]
pub fn raw_data_column() -> ColumnModel {
    ColumnModel::new(COLUMN_RAW_DATA, ColumnType::FileHandleId)
}

/// Table whose fields are bound at construction
#[derive(Debug, Clone)]
pub struct HealthDataVariant {
    table_key: String,
    fields: Vec<FieldDefinition>,
}

impl HealthDataVariant {
    /// Creates the variant
    pub fn new(table_key: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            table_key: table_key.into(),
            fields,
        }
    }

    /// Bound fields
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }
}

#[async_trait]
impl TableVariant for HealthDataVariant {
    fn table_key(&self) -> &str {
        &self.table_key
    }

    async fn columns(
        &self,
        _ctx: &HandlerContext,
        _request: &ExportRequest,
    ) -> Result<Vec<ColumnModel>> {
        Ok(columns_for_fields(&self.fields))
    }

    async fn values(
        &self,
        ctx: &HandlerContext,
        task: &mut ExportTask,
        subtask: &ExportSubtask,
    ) -> Result<Option<Vec<Option<String>>>> {
        let data = subtask.record_data()?;
        let values = ctx
            .serializer
            .serialize_fields(&self.fields, &data, task.metrics_mut())
            .await;
        Ok(Some(values))
    }

    async fn after_upload(&self, ctx: &HandlerContext, record_ids: &[String]) {
        ctx.report_exported(&self.table_key, record_ids).await;
    }
}
