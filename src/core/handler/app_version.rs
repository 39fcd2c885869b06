//! App-version table
//!
//! One row per record of a study, naming the table the record went to. The
//! distinct app versions seen per study are collected into the task metrics
//! under `uniqueAppVersions[<study>]`.

use super::{HandlerContext, TableVariant};
use crate::core::task::ExportTask;
use crate::domain::{
    ColumnModel, ExportRequest, ExportSubtask, Result, StudyConfig, StudyId,
};
use async_trait::async_trait;
use tokio::sync::OnceCell;

/// Column naming the table a record was exported to
pub const COLUMN_ORIGINAL_TABLE: &str = "originalTable";

/// Table name recorded for schemaless records
pub const DEFAULT_TABLE_NAME: &str = "Default Health Data Record Table";

const ORIGINAL_TABLE_LENGTH: u32 = 128;

/// Table key of a study's app-version table
pub fn app_version_table_key(study_id: &StudyId) -> String {
    format!("{study_id}-appVersion")
}

/// Key of the per-study app version set in the task metrics
pub fn unique_app_versions_key(study_id: &StudyId) -> String {
    format!("uniqueAppVersions[{study_id}]")
}

/// App-version table of one study
pub struct AppVersionVariant {
    study_id: StudyId,
    table_key: String,
    study: OnceCell<StudyConfig>,
}

impl AppVersionVariant {
    /// Creates the variant for a study; its table key is `<study>-appVersion`
    pub fn new(study_id: StudyId) -> Self {
        let table_key = app_version_table_key(&study_id);
        Self {
            study_id,
            table_key,
            study: OnceCell::new(),
        }
    }

    /// Creates the variant for an already resolved study
    pub fn with_study(study: StudyConfig) -> Self {
        let table_key = app_version_table_key(&study.study_id);
        Self {
            study_id: study.study_id.clone(),
            table_key,
            study: OnceCell::new_with(Some(study)),
        }
    }
}

#[async_trait]
impl TableVariant for AppVersionVariant {
    fn table_key(&self) -> &str {
        &self.table_key
    }

    async fn columns(
        &self,
        _ctx: &HandlerContext,
        _request: &ExportRequest,
    ) -> Result<Vec<ColumnModel>> {
        Ok(vec![ColumnModel::string(
            COLUMN_ORIGINAL_TABLE,
            ORIGINAL_TABLE_LENGTH,
        )])
    }

    async fn values(
        &self,
        ctx: &HandlerContext,
        task: &mut ExportTask,
        subtask: &ExportSubtask,
    ) -> Result<Option<Vec<Option<String>>>> {
        let study = self
            .study
            .get_or_try_init(|| ctx.directory.get_study(&self.study_id))
            .await?;
        if study.excluded {
            return Ok(None);
        }

        let original_table = match &subtask.schema_key {
            Some(key) if study.study_id_excluded_in_export => key.schema_id_and_revision(),
            Some(key) => key.to_string(),
            None => DEFAULT_TABLE_NAME.to_string(),
        };

        if let Some(app_version) = subtask.attributes.metadata().app_version {
            task.metrics_mut()
                .add_key_value(&unique_app_versions_key(&self.study_id), app_version);
        }

        Ok(Some(vec![Some(original_table)]))
    }
}
