//! Tables bound to an upload schema
//!
//! The schema is either supplied up front or looked up from the study
//! directory the first time it is needed, and kept for the rest of the run.

use super::health_data::raw_data_column;
use super::{HandlerContext, TableVariant};
use crate::core::serialize::columns_for_fields;
use crate::core::task::ExportTask;
use crate::domain::{
    ColumnModel, ExportRequest, ExportSubtask, Result, SchemaKey, UploadSchema,
};
use async_trait::async_trait;
use tokio::sync::OnceCell;

/// Table of one schema revision, keyed `<study>-<schema>-v<revision>`
pub struct SchemaBasedVariant {
    schema_key: SchemaKey,
    table_key: String,
    schema: OnceCell<UploadSchema>,
}

impl SchemaBasedVariant {
    /// Creates the variant for a schema
    pub fn new(schema_key: SchemaKey) -> Self {
        let table_key = schema_key.to_string();
        Self {
            schema_key,
            table_key,
            schema: OnceCell::new(),
        }
    }

    /// Creates the variant for an already resolved schema
    pub fn with_schema(schema: UploadSchema) -> Self {
        let schema_key = schema.key.clone();
        Self {
            table_key: schema_key.to_string(),
            schema_key,
            schema: OnceCell::new_with(Some(schema)),
        }
    }

    /// Schema key the table is bound to
    pub fn schema_key(&self) -> &SchemaKey {
        &self.schema_key
    }

    async fn schema(&self, ctx: &HandlerContext, request: &ExportRequest) -> Result<&UploadSchema> {
        self.schema
            .get_or_try_init(|| ctx.directory.get_schema(request, &self.schema_key))
            .await
    }
}

#[async_trait]
impl TableVariant for SchemaBasedVariant {
    fn table_key(&self) -> &str {
        &self.table_key
    }

    async fn columns(
        &self,
        ctx: &HandlerContext,
        request: &ExportRequest,
    ) -> Result<Vec<ColumnModel>> {
        let schema = self.schema(ctx, request).await?;
        let mut columns = columns_for_fields(&schema.field_definitions);
        columns.push(raw_data_column());
        Ok(columns)
    }

    async fn values(
        &self,
        ctx: &HandlerContext,
        task: &mut ExportTask,
        subtask: &ExportSubtask,
    ) -> Result<Option<Vec<Option<String>>>> {
        let data = subtask.record_data()?;
        let schema = self.schema(ctx, task.request()).await?;

        let mut values = ctx
            .serializer
            .serialize_fields(&schema.field_definitions, &data, task.metrics_mut())
            .await;
        values.push(ctx.raw_data_file_handle(subtask).await);
        Ok(Some(values))
    }

    async fn after_upload(&self, ctx: &HandlerContext, record_ids: &[String]) {
        ctx.report_exported(&self.table_key, record_ids).await;
    }
}
