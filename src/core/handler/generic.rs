//! Single-field tables

use super::{HandlerContext, TableVariant};
use crate::core::serialize::columns_for_field;
use crate::core::task::ExportTask;
use crate::domain::{ColumnModel, ExportRequest, ExportSubtask, FieldDefinition, FieldType, Result};
use async_trait::async_trait;

/// One STRING column copied from one field of the record payload
#[derive(Debug, Clone)]
pub struct SingleFieldVariant {
    table_key: String,
    field: FieldDefinition,
}

impl SingleFieldVariant {
    /// Creates a variant copying `field_name` into a column of the same name
    pub fn new(table_key: impl Into<String>, field_name: impl Into<String>, max_length: u32) -> Self {
        Self {
            table_key: table_key.into(),
            field: FieldDefinition::new(field_name, FieldType::String).max_length(max_length),
        }
    }
}

#[async_trait]
impl TableVariant for SingleFieldVariant {
    fn table_key(&self) -> &str {
        &self.table_key
    }

    async fn columns(
        &self,
        _ctx: &HandlerContext,
        _request: &ExportRequest,
    ) -> Result<Vec<ColumnModel>> {
        Ok(columns_for_field(&self.field))
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
            .serialize_field(&self.field, data.get(&self.field.name), task.metrics_mut())
            .await;
        Ok(Some(values))
    }
}
