//! Export command implementation
//!
//! This module implements the `export` command: one export run over the
//! subtasks of a JSON-lines file, one subtask per line:
//!
//! ```json
//! {"study_id":"my-study","schema_id":"my-schema","schema_revision":1,"attributes":{"id":"r1"},"record":{"foo":"bar"}}
//! ```
//!
//! `record` may be an object or the raw payload as a string. Records without
//! `schema_id` are schemaless.

use crate::adapters::{create_study_directory, create_table_id_cache, create_table_store};
use crate::config::{load_config, CohortConfig};
use crate::core::export::{ExportRunner, ExportSummary};
use crate::core::handler::HandlerContext;
use crate::core::provision::TableProvisioner;
use crate::core::row::CommonColumns;
use crate::core::serialize::FieldSerializer;
use crate::core::task::ExportTask;
use crate::domain::{
    CohortError, ExportRequest, ExportSubtask, RecordAttributes, Result, SchemaKey, StudyId,
};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Args;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON-lines file with one subtask per line
    #[arg(short, long)]
    pub input: String,

    /// Export date written to the uploadDate column (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date: Option<String>,

    /// Dry run mode - stage TSV files without touching the table store
    #[arg(long)]
    pub dry_run: bool,

    /// Only export these studies (comma-separated)
    #[arg(long)]
    pub study: Option<String>,

    /// Tag attached to the run's log events
    #[arg(long)]
    pub tag: Option<String>,
}

/// One line of the input file
#[derive(Debug, Deserialize)]
struct SubtaskLine {
    study_id: StudyId,
    #[serde(default)]
    schema_id: Option<String>,
    #[serde(default)]
    schema_revision: Option<u32>,
    #[serde(default)]
    attributes: RecordAttributes,
    record: Value,
}

impl SubtaskLine {
    fn into_subtask(self) -> Result<ExportSubtask> {
        let schema_key = match self.schema_id {
            Some(schema_id) => Some(
                SchemaKey::new(
                    self.study_id.clone(),
                    schema_id,
                    self.schema_revision.unwrap_or(1),
                )
                .map_err(CohortError::Other)?,
            ),
            None => None,
        };
        let record_json = match self.record {
            Value::String(raw) => raw,
            other => other.to_string(),
        };
        ExportSubtask::builder()
            .attributes(self.attributes)
            .record_json(record_json)
            .schema_key(schema_key)
            .study_id(self.study_id)
            .build()
            .map_err(CohortError::Other)
    }
}

/// Parses the subtasks of a JSON-lines document
///
/// Blank lines are skipped. Lines that do not parse are logged and counted.
///
/// # Returns
///
/// Returns the parsed subtasks and the number of rejected lines.
pub fn parse_subtasks(contents: &str) -> (Vec<ExportSubtask>, usize) {
    let mut subtasks = Vec::new();
    let mut rejected = 0;
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = serde_json::from_str::<SubtaskLine>(line)
            .map_err(CohortError::from)
            .and_then(SubtaskLine::into_subtask);
        match parsed {
            Ok(subtask) => subtasks.push(subtask),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping unreadable input line");
                rejected += 1;
            }
        }
    }
    (subtasks, rejected)
}

/// Builds the handler context of a run from configuration
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the table-id cache
/// cannot be initialized.
pub async fn build_context(config: &CohortConfig) -> Result<Arc<HandlerContext>> {
    let store = create_table_store(config);
    let directory = create_study_directory(config)?;
    let cache = create_table_id_cache(&config.cache).await?;

    Ok(Arc::new(HandlerContext {
        directory,
        store: store.clone(),
        provisioner: TableProvisioner::new(
            store.clone(),
            cache,
            config.table_store.principal_id,
            config.cache.table_prefix.clone(),
        ),
        serializer: FieldSerializer::new(store, config.export.large_text_attachment_threshold),
        common_columns: CommonColumns::new(config.columns.clone()),
        dry_run: config.application.dry_run,
    }))
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        let exporter_date = match &self.date {
            Some(date) => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("Invalid --date '{date}': {e}");
                    return Ok(2);
                }
            },
            None => Utc::now().date_naive(),
        };

        let mut request = ExportRequest::new(Utc::now());
        if let Some(studies) = &self.study {
            let whitelist: BTreeSet<String> = studies
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::info!(studies = ?whitelist, "Restricting export to studies");
            request.study_whitelist = Some(whitelist);
        }
        if let Some(tag) = &self.tag {
            request = request.tag(tag.clone());
        }

        let contents = std::fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read input file {}", self.input))?;
        let (subtasks, rejected) = parse_subtasks(&contents);

        if config.application.dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - No data will be written to the table store");
            println!();
        }

        let context = match build_context(&config).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize export");
                eprintln!("Failed to initialize export: {e}");
                return Ok(match e {
                    CohortError::Configuration(_) => 2,
                    _ => 5,
                });
            }
        };

        let mut task_builder = ExportTask::builder()
            .exporter_date(exporter_date)
            .request(request);
        if let Some(scratch_dir) = &config.export.scratch_dir {
            task_builder = task_builder.scratch_parent(scratch_dir);
        }
        let task = task_builder.build()?;

        println!("🚀 Starting export of {} records...", subtasks.len());
        println!();

        let summary = match ExportRunner::new(context)
            .with_progress_report_period(config.export.progress_report_period)
            .run(task, &subtasks)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Export aborted: {e}");
                return Ok(match e {
                    CohortError::Configuration(_)
                    | CohortError::Schema(_)
                    | CohortError::Study(_) => 2,
                    _ => 5,
                });
            }
        };

        print_summary(&summary, rejected);

        let exit_code = if summary.is_successful() && rejected == 0 {
            println!("✅ Export completed successfully!");
            0
        } else {
            println!("⚠️  Export completed with failures");
            1
        };
        Ok(exit_code)
    }
}

fn print_summary(summary: &ExportSummary, rejected: usize) {
    println!();
    println!("📊 Export Summary:");
    println!("  Total Records: {}", summary.total_records);
    println!("  Unreadable Lines: {rejected}");
    println!("  Skipped (study filter): {}", summary.skipped_records);
    println!("  Failed Records: {}", summary.failed_records);
    println!("  Tables Committed: {}", summary.committed_tables.len());
    for table in &summary.committed_tables {
        println!(
            "    - {} -> {} ({} rows)",
            table.table_key,
            table.table_id.as_deref().unwrap_or("dry run"),
            table.line_count
        );
    }
    println!("  Tables Failed: {}", summary.failed_tables.len());
    println!("  Uploaded Rows: {}", summary.uploaded_rows());
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in summary.errors.iter().take(10) {
            println!("  - {:?}: {}", error.error_type, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        if summary.errors.len() > 10 {
            println!("  ... and {} more errors", summary.errors.len() - 10);
        }
        println!();
    }
}
