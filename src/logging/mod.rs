//! Logging and observability
//!
//! Structured logging through `tracing`: a console layer, an optional JSON
//! file layer with rotation, and a few macros for the events the export
//! pipeline emits at its decision points.
//!
//! # Example
//!
//! ```no_run
//! use cohort::logging::init_logging;
//! use cohort::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a record that could not be turned into a row
///
/// # Example
///
/// ```no_run
/// use cohort::log_record_error;
/// use cohort::domain::CohortError;
///
/// let error = CohortError::RecordContent("{not json".to_string());
/// log_record_error!("my-study-my-schema-v1", "record-1", &error);
/// ```
#[macro_export]
macro_rules! log_record_error {
    ($table_key:expr, $record_id:expr, $error:expr) => {
        tracing::warn!(
            table_key = %$table_key,
            record_id = %$record_id,
            error = %$error,
            "Error processing record"
        );
    };
}

/// Log the outcome of a table commit
///
/// # Example
///
/// ```no_run
/// use cohort::log_table_commit;
///
/// log_table_commit!("my-study-my-schema-v1", "syn123", 42u64);
/// ```
#[macro_export]
macro_rules! log_table_commit {
    ($table_key:expr, $table_id:expr, $rows:expr) => {
        tracing::info!(
            table_key = %$table_key,
            table_id = %$table_id,
            rows = $rows,
            "Uploaded TSV to table"
        );
    };
}

/// Log a field whose value degraded to empty
///
/// # Example
///
/// ```no_run
/// use cohort::log_field_degraded;
///
/// log_field_degraded!("submitTime", "not a timestamp");
/// ```
#[macro_export]
macro_rules! log_field_degraded {
    ($field:expr, $reason:expr) => {
        tracing::warn!(
            field = %$field,
            reason = %$reason,
            "Field value exported as empty"
        );
    };
}

/// Log export progress
///
/// # Example
///
/// ```no_run
/// use cohort::log_progress;
///
/// log_progress!(250, 1000);
/// ```
#[macro_export]
macro_rules! log_progress {
    ($current:expr, $total:expr) => {
        tracing::info!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Export progress"
        );
    };
}
