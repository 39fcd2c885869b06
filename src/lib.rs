// Cohort - Health-study record exporter
// Copyright (c) 2025 Cohort Contributors
// Licensed under the MIT License

//! # Cohort - Health-study record exporter
//!
//! Cohort exports health-study records into per-study tables of a tabular
//! data store. Each run turns input records into typed rows, stages the rows
//! of every destination table in a TSV file and commits each file in one bulk
//! upload at the end of the run.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Serializing** schema fields into table cells (dates, timestamps,
//!   multi-choice answers, attachments, large text)
//! - **Building rows** from the common columns every table carries and the
//!   columns of the destination's variant
//! - **Staging** rows in TSV files per table and committing them in bulk
//! - **Provisioning** tables on first use and adding columns when a schema grows
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (serialization, rows, staging, handlers, runs)
//! - [`adapters`] - Table store, table-id cache and study directory implementations
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cohort::cli::commands::export::build_context;
//! use cohort::config::load_config;
//! use cohort::core::export::ExportRunner;
//! use cohort::core::task::ExportTask;
//! use cohort::domain::ExportRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("cohort.toml")?;
//!     let context = build_context(&config).await?;
//!
//!     let task = ExportTask::builder()
//!         .exporter_date(chrono::Utc::now().date_naive())
//!         .request(ExportRequest::new(chrono::Utc::now()))
//!         .build()?;
//!
//!     let summary = ExportRunner::new(context).run(task, &[]).await?;
//!     println!("Uploaded {} rows", summary.uploaded_rows());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Cohort uses the [`domain::CohortError`] type for all errors:
//!
//! ```rust,no_run
//! use cohort::domain::CohortError;
//!
//! fn example() -> Result<(), CohortError> {
//!     let config = cohort::config::load_config("cohort.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! A record that cannot be serialized fails alone: the run counts it and
//! moves on. A table that cannot be committed fails alone as well.
//!
//! ## Logging
//!
//! Cohort uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting export");
//! warn!(table_key = "my-study-appVersion", "Table committed with errors");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
