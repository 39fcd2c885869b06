//! Export summary and reporting
//!
//! This module defines structures for tracking and reporting export results.

use crate::core::handler::CommitOutcome;
use crate::core::task::Metrics;
use crate::domain::CohortError;
use std::time::Duration;

/// Summary of an export run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Subtasks handed to the run
    pub total_records: usize,

    /// Subtasks outside the request's study whitelist
    pub skipped_records: usize,

    /// Subtasks that failed in at least one table
    pub failed_records: usize,

    /// Tables committed this run
    pub committed_tables: Vec<CommitOutcome>,

    /// Keys of the tables whose commit failed
    pub failed_tables: Vec<String>,

    /// Duration of the run
    pub duration: Duration,

    /// Errors encountered during the run
    pub errors: Vec<ExportError>,

    /// Metrics of the run's task
    pub metrics: Metrics,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new() -> Self {
        Self {
            total_records: 0,
            skipped_records: 0,
            failed_records: 0,
            committed_tables: Vec::new(),
            failed_tables: Vec::new(),
            duration: Duration::from_secs(0),
            errors: Vec::new(),
            metrics: Metrics::default(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Rows uploaded across all committed tables
    pub fn uploaded_rows(&self) -> u64 {
        self.committed_tables.iter().map(|t| t.uploaded_rows).sum()
    }

    /// Check if the run had neither record errors nor failed tables
    pub fn is_successful(&self) -> bool {
        self.failed_records == 0 && self.failed_tables.is_empty() && self.errors.is_empty()
    }

    /// Share of handled records that produced every row, as a percentage
    pub fn success_rate(&self) -> f64 {
        let handled = self.total_records - self.skipped_records;
        if handled == 0 {
            return 100.0;
        }
        ((handled - self.failed_records) as f64 / handled as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total_records = self.total_records,
            skipped = self.skipped_records,
            failed = self.failed_records,
            tables_committed = self.committed_tables.len(),
            tables_failed = self.failed_tables.len(),
            uploaded_rows = self.uploaded_rows(),
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Export completed"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "Export error"
                );
            }
        }
    }
}

impl Default for ExportSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of export error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportErrorType {
    /// A record payload could not be parsed
    RecordContent,
    /// A table could not be provisioned or uploaded
    TableCommit,
    /// Missing study or schema metadata, or bad configuration
    Configuration,
    /// Unknown error
    Unknown,
}

impl From<&CohortError> for ExportErrorType {
    fn from(error: &CohortError) -> Self {
        match error {
            CohortError::RecordContent(_) => ExportErrorType::RecordContent,
            CohortError::TableStore(_) | CohortError::Cache(_) => ExportErrorType::TableCommit,
            CohortError::Configuration(_) | CohortError::Schema(_) | CohortError::Study(_) => {
                ExportErrorType::Configuration
            }
            _ => ExportErrorType::Unknown,
        }
    }
}

/// Export error with context
#[derive(Debug, Clone)]
pub struct ExportError {
    /// Type of error
    pub error_type: ExportErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g., table key, record id)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<&CohortError> for ExportError {
    fn from(error: &CohortError) -> Self {
        Self::new(ExportErrorType::from(error), error.to_string())
    }
}
