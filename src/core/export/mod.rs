//! Export orchestration
//!
//! This module provides the driver of an export run:
//! - Routing subtasks to the handlers of their tables
//! - Committing every table at the end of the run
//! - Summary and reporting

pub mod runner;
pub mod summary;

pub use runner::{ExportRunner, DEFAULT_PROGRESS_REPORT_PERIOD};
pub use summary::{ExportError, ExportErrorType, ExportSummary};
