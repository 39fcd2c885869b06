//! Export runner - drives one export run
//!
//! Routes each subtask, in arrival order, to the handlers of its study:
//!
//! 1. the study's app-version handler
//! 2. the schema-based handler of the subtask's schema, or the study's
//!    schemaless handler when it has none
//!
//! Every study and schema the run needs is resolved before the first subtask
//! is handled; a missing one fails the whole run. After that, a failing
//! subtask is counted and the run moves on. Once every subtask is
//! handled, every table that received rows is committed; a failed commit is
//! reported and does not affect the other tables.

use crate::core::export::summary::{ExportError, ExportSummary};
use crate::core::handler::{
    app_version_table_key, schemaless_table_key, AppVersionVariant, ExportHandler,
    HandlerContext, SchemaBasedVariant, SchemalessVariant,
};
use crate::core::task::ExportTask;
use crate::domain::{ExportSubtask, Result, SchemaKey, StudyConfig, StudyId, UploadSchema};
use crate::log_progress;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Default number of subtasks between progress reports
pub const DEFAULT_PROGRESS_REPORT_PERIOD: usize = 250;

/// Drives export runs
pub struct ExportRunner {
    context: Arc<HandlerContext>,
    progress_report_period: usize,
}

/// Handlers of one run, in creation order
#[derive(Default)]
struct HandlerSet {
    handlers: Vec<ExportHandler>,
    index_by_key: HashMap<String, usize>,
}

impl HandlerSet {
    fn index_of(&mut self, table_key: String, create: impl FnOnce() -> ExportHandler) -> usize {
        if let Some(index) = self.index_by_key.get(&table_key) {
            return *index;
        }
        self.handlers.push(create());
        let index = self.handlers.len() - 1;
        self.index_by_key.insert(table_key, index);
        index
    }
}

/// Studies and schemas referenced by the subtasks of a run
#[derive(Default)]
struct Catalog {
    studies: HashMap<StudyId, StudyConfig>,
    schemas: HashMap<SchemaKey, UploadSchema>,
}

impl ExportRunner {
    /// Creates a runner
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self {
            context,
            progress_report_period: DEFAULT_PROGRESS_REPORT_PERIOD,
        }
    }

    /// Sets how often progress is logged (0 disables it)
    pub fn with_progress_report_period(mut self, period: usize) -> Self {
        self.progress_report_period = period;
        self
    }

    /// Runs an export over `subtasks` and consumes the task
    ///
    /// The task's scratch directory is removed when this returns.
    ///
    /// # Errors
    ///
    /// Returns the directory's error when a study or schema referenced by an
    /// included subtask cannot be resolved. No subtask is handled and
    /// nothing is written in that case.
    pub async fn run(
        &self,
        mut task: ExportTask,
        subtasks: &[ExportSubtask],
    ) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut summary = ExportSummary::new();
        let mut handlers = HandlerSet::default();
        summary.total_records = subtasks.len();

        tracing::info!(
            records = subtasks.len(),
            exporter_date = %task.exporter_date(),
            tag = task.request().tag.as_deref().unwrap_or(""),
            "Starting export run"
        );

        let catalog = match self.resolve_catalog(&task, subtasks).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve export catalog");
                return Err(e);
            }
        };

        for (index, subtask) in subtasks.iter().enumerate() {
            if !task.request().includes_study(subtask.study_id.as_str()) {
                summary.skipped_records += 1;
                continue;
            }

            let mut failed = false;
            for handler_index in self.route(&mut handlers, &catalog, subtask) {
                let handler = &handlers.handlers[handler_index];
                if let Err(e) = handler.handle(&mut task, subtask).await {
                    failed = true;
                    summary.add_error(ExportError::from(&e).with_context(format!(
                        "table_key={}, record_id={}",
                        handler.table_key(),
                        subtask.record_id()
                    )));
                }
            }
            if failed {
                summary.failed_records += 1;
            }

            let processed = index + 1;
            if self.progress_report_period > 0 && processed % self.progress_report_period == 0 {
                log_progress!(processed, subtasks.len());
            }
        }

        for handler in &handlers.handlers {
            match handler.upload_to_table_for_task(&mut task).await {
                Ok(Some(outcome)) => summary.committed_tables.push(outcome),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        table_key = handler.table_key(),
                        error = %e,
                        "Table commit failed"
                    );
                    summary.failed_tables.push(handler.table_key().to_string());
                    summary.add_error(
                        ExportError::from(&e)
                            .with_context(format!("table_key={}", handler.table_key())),
                    );
                }
            }
        }

        task.metrics().log_summary();
        summary.metrics = task.metrics().clone();
        drop(task);

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Looks up every study and schema the included subtasks reference
    async fn resolve_catalog(
        &self,
        task: &ExportTask,
        subtasks: &[ExportSubtask],
    ) -> Result<Catalog> {
        let directory = &self.context.directory;
        let mut catalog = Catalog::default();

        for subtask in subtasks {
            if !task.request().includes_study(subtask.study_id.as_str()) {
                continue;
            }
            if !catalog.studies.contains_key(&subtask.study_id) {
                let study = directory.get_study(&subtask.study_id).await?;
                catalog.studies.insert(subtask.study_id.clone(), study);
            }
            if let Some(schema_key) = &subtask.schema_key {
                if !catalog.schemas.contains_key(schema_key) {
                    let schema = directory.get_schema(task.request(), schema_key).await?;
                    catalog.schemas.insert(schema_key.clone(), schema);
                }
            }
        }

        tracing::debug!(
            studies = catalog.studies.len(),
            schemas = catalog.schemas.len(),
            "Resolved export catalog"
        );
        Ok(catalog)
    }

    /// Indices of the handlers a subtask goes to, creating them when needed
    fn route(
        &self,
        handlers: &mut HandlerSet,
        catalog: &Catalog,
        subtask: &ExportSubtask,
    ) -> [usize; 2] {
        let study_id = &subtask.study_id;

        let app_version = handlers.index_of(app_version_table_key(study_id), || {
            let variant = match catalog.studies.get(study_id) {
                Some(study) => AppVersionVariant::with_study(study.clone()),
                None => AppVersionVariant::new(study_id.clone()),
            };
            ExportHandler::new(self.context.clone(), study_id.clone(), variant)
        });

        let health_data = match &subtask.schema_key {
            Some(schema_key) => handlers.index_of(schema_key.to_string(), || {
                let variant = match catalog.schemas.get(schema_key) {
                    Some(schema) => SchemaBasedVariant::with_schema(schema.clone()),
                    None => SchemaBasedVariant::new(schema_key.clone()),
                };
                ExportHandler::new(self.context.clone(), study_id.clone(), variant)
            }),
            None => handlers.index_of(schemaless_table_key(study_id), || {
                ExportHandler::new(
                    self.context.clone(),
                    study_id.clone(),
                    SchemalessVariant::new(study_id),
                )
            }),
        };

        [app_version, health_data]
    }
}
