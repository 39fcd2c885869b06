//! Export tasks
//!
//! An [`ExportTask`] is one export run: the run date, the metrics sink, the
//! originating request, a private scratch directory and the staged TSV state of
//! every table that received rows. The task owns all of it exclusively; dropping
//! the task removes the scratch directory along with any staged file left in it.

pub mod metrics;

pub use metrics::{
    table_counter, Metrics, ERROR_COUNT_SUFFIX, LARGE_TEXT_ATTACHMENT_COUNTER,
    LINE_COUNT_SUFFIX, UPLOADED_ROWS_SUFFIX,
};

use crate::core::tsv::TsvInfo;
use crate::domain::{CohortError, ExportRequest, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One export run
#[derive(Debug)]
pub struct ExportTask {
    exporter_date: NaiveDate,
    metrics: Metrics,
    request: ExportRequest,
    tsv_info_by_key: BTreeMap<String, TsvInfo>,
    // Declared last so staged files are released before their directory goes.
    scratch_dir: TempDir,
}

impl ExportTask {
    /// Creates a new builder
    pub fn builder() -> ExportTaskBuilder {
        ExportTaskBuilder::default()
    }

    /// Date of the run, written to the `uploadDate` column
    pub fn exporter_date(&self) -> NaiveDate {
        self.exporter_date
    }

    /// Metrics sink
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Mutable metrics sink
    pub fn metrics_mut(&mut self) -> &mut Metrics {
        &mut self.metrics
    }

    /// Request that started the run
    pub fn request(&self) -> &ExportRequest {
        &self.request
    }

    /// Private scratch directory
    pub fn scratch_dir(&self) -> &Path {
        self.scratch_dir.path()
    }

    /// Staged TSV state of a table, if it received rows
    pub fn tsv_info(&self, table_key: &str) -> Option<&TsvInfo> {
        self.tsv_info_by_key.get(table_key)
    }

    /// Keys of the tables holding staged rows
    pub fn table_keys(&self) -> Vec<String> {
        self.tsv_info_by_key.keys().cloned().collect()
    }

    pub(crate) fn tsv_info_mut(&mut self, table_key: &str) -> Option<&mut TsvInfo> {
        self.tsv_info_by_key.get_mut(table_key)
    }

    pub(crate) fn insert_tsv_info(&mut self, table_key: &str, tsv_info: TsvInfo) {
        self.tsv_info_by_key.insert(table_key.to_string(), tsv_info);
    }

    /// Removes a table's staged state for commit
    pub(crate) fn take_tsv_info(&mut self, table_key: &str) -> Option<TsvInfo> {
        self.tsv_info_by_key.remove(table_key)
    }
}

/// Builder for constructing ExportTask instances
#[derive(Debug, Default)]
pub struct ExportTaskBuilder {
    exporter_date: Option<NaiveDate>,
    metrics: Option<Metrics>,
    request: Option<ExportRequest>,
    scratch_parent: Option<PathBuf>,
}

impl ExportTaskBuilder {
    /// Sets the run date
    pub fn exporter_date(mut self, date: NaiveDate) -> Self {
        self.exporter_date = Some(date);
        self
    }

    /// Sets the metrics sink (a fresh one is used otherwise)
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the originating request
    pub fn request(mut self, request: ExportRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Sets the directory the scratch directory is created in
    pub fn scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }

    /// Builds the ExportTask, creating its scratch directory
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or the scratch directory
    /// cannot be created.
    pub fn build(self) -> Result<ExportTask> {
        let exporter_date = self
            .exporter_date
            .ok_or_else(|| CohortError::Other("exporter_date is required".to_string()))?;
        let request = self
            .request
            .ok_or_else(|| CohortError::Other("request is required".to_string()))?;

        let mut dir_builder = tempfile::Builder::new();
        dir_builder.prefix("cohort-task-");
        let scratch_dir = match self.scratch_parent {
            Some(parent) => dir_builder.tempdir_in(parent)?,
            None => dir_builder.tempdir()?,
        };

        tracing::debug!(
            scratch_dir = %scratch_dir.path().display(),
            exporter_date = %exporter_date,
            "Created export task"
        );

        Ok(ExportTask {
            exporter_date,
            metrics: self.metrics.unwrap_or_default(),
            request,
            tsv_info_by_key: BTreeMap::new(),
            scratch_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task_in(parent: &Path) -> ExportTask {
        ExportTask::builder()
            .exporter_date(NaiveDate::from_ymd_opt(2016, 5, 9).unwrap())
            .request(ExportRequest::new(Utc::now()))
            .scratch_parent(parent)
            .build()
            .unwrap()
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let task = task_in(parent.path());
        let scratch = task.scratch_dir().to_path_buf();
        assert!(scratch.is_dir());
        assert!(scratch.starts_with(parent.path()));

        drop(task);
        assert!(!scratch.exists());
    }

    #[test]
    fn test_builder_requires_date() {
        let result = ExportTask::builder()
            .request(ExportRequest::new(Utc::now()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_new_task_has_no_tables() {
        let parent = tempfile::tempdir().unwrap();
        let task = task_in(parent.path());
        assert!(task.table_keys().is_empty());
        assert!(task.tsv_info("anything").is_none());
        assert_eq!(task.metrics(), &Metrics::new());
    }
}
