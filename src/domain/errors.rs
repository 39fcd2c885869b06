//! Domain error types
//!
//! This module defines the error hierarchy for Cohort. Errors fall into four
//! classes: record-content errors (one subtask is skipped), field-level
//! degradations (never surfaced as errors), table-commit errors (one table fails
//! for the run) and configuration errors (fatal before any subtask runs).

use thiserror::Error;

/// Main Cohort error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum CohortError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The raw record payload could not be turned into a row.
    ///
    /// The message is the offending raw content, verbatim.
    #[error("{0}")]
    RecordContent(String),

    /// Table store errors
    #[error("Table store error: {0}")]
    TableStore(#[from] TableStoreError),

    /// Table-id cache errors
    #[error("Table-id cache error: {0}")]
    Cache(String),

    /// Schema lookup errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Study lookup errors
    #[error("Study error: {0}")]
    Study(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl CohortError {
    /// Returns true for errors caused by the content of a single record
    pub fn is_record_content(&self) -> bool {
        matches!(self, CohortError::RecordContent(_))
    }
}

/// Table store errors
///
/// Errors raised by the external table store collaborator. None of them are
/// retried by Cohort; retry policy belongs to the store's client.
#[derive(Debug, Error)]
pub enum TableStoreError {
    /// Failed to create a table
    #[error("Failed to create table for {key}: {message}")]
    CreateTableFailed { key: String, message: String },

    /// Failed to fetch the column models of a table
    #[error("Failed to fetch columns of table {table_id}: {message}")]
    ColumnFetchFailed { table_id: String, message: String },

    /// Failed to add columns to a table
    #[error("Failed to add columns to table {table_id}: {message}")]
    AddColumnsFailed { table_id: String, message: String },

    /// Failed to bulk-upload a TSV file
    #[error("Failed to upload TSV to table {table_id}: {message}")]
    UploadFailed { table_id: String, message: String },

    /// Failed to upload or download an attachment
    #[error("Attachment {reference} failed: {message}")]
    AttachmentFailed { reference: String, message: String },

    /// Table not found
    #[error("Table not found: {0}")]
    NotFound(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for CohortError {
    fn from(err: std::io::Error) -> Self {
        CohortError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CohortError {
    fn from(err: serde_json::Error) -> Self {
        CohortError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CohortError {
    fn from(err: toml::de::Error) -> Self {
        CohortError::Configuration(format!("TOML parse error: {err}"))
    }
}
