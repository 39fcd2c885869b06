//! Core business logic for Cohort.
//!
//! This module contains the record export pipeline and its orchestration.
//!
//! # Modules
//!
//! - [`serialize`] - Field expansion into columns and value encoding
//! - [`row`] - Common columns leading every row
//! - [`tsv`] - TSV escaping and staged files
//! - [`task`] - Export runs and their metrics
//! - [`provision`] - Table provisioning and column reconciliation
//! - [`handler`] - Per-table handlers and their variants
//! - [`export`] - Run orchestration and summary
//!
//! # Export Workflow
//!
//! 1. **Create Task**: one [`task::ExportTask`] per run, with its scratch directory
//! 2. **Handle**: each subtask becomes one row in each of its tables
//! 3. **Provision**: tables that received rows are created or reconciled
//! 4. **Upload**: staged TSV files are bulk-loaded and released
//! 5. **Report**: metrics and an export summary are logged
//!
//! # Example
//!
//! ```rust,no_run
//! use cohort::core::export::ExportRunner;
//! use cohort::core::handler::HandlerContext;
//! use cohort::core::task::ExportTask;
//! use cohort::domain::{ExportRequest, ExportSubtask};
//! use std::sync::Arc;
//!
//! # async fn example(context: Arc<HandlerContext>, subtasks: Vec<ExportSubtask>) -> Result<(), Box<dyn std::error::Error>> {
//! let task = ExportTask::builder()
//!     .exporter_date(chrono::Utc::now().date_naive())
//!     .request(ExportRequest::new(chrono::Utc::now()))
//!     .build()?;
//!
//! let summary = ExportRunner::new(context).run(task, &subtasks).await?;
//!
//! println!("Records: {}", summary.total_records);
//! println!("Failed: {}", summary.failed_records);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod handler;
pub mod provision;
pub mod row;
pub mod serialize;
pub mod task;
pub mod tsv;
