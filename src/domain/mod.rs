//! Domain models and types for Cohort.
//!
//! This module contains the core domain types shared by the export pipeline:
//!
//! - **Strongly-typed identifiers** ([`StudyId`], [`SchemaKey`])
//! - **Schema model** ([`UploadSchema`], [`FieldDefinition`], [`FieldType`])
//! - **Table model** ([`ColumnModel`], [`ColumnType`])
//! - **Input records** ([`ExportSubtask`], [`RecordAttributes`])
//! - **Error types** ([`CohortError`], [`TableStoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, CohortError>`]:
//!
//! ```rust,no_run
//! use cohort::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = cohort::config::load_config("cohort.toml")?;
//!     config.validate().map_err(cohort::domain::CohortError::Configuration)?;
//!     Ok(())
//! }
//! ```
//!
//! # Builder Pattern
//!
//! Subtasks and schemas use the builder pattern for construction:
//!
//! ```rust
//! use cohort::domain::{ExportSubtask, RecordAttributes, StudyId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let subtask = ExportSubtask::builder()
//!     .attributes(RecordAttributes::new().with_string("id", "record-1"))
//!     .record_json(r#"{"foo":"bar"}"#)
//!     .study_id(StudyId::new("my-study")?)
//!     .build()?;
//! assert_eq!(subtask.record_id(), "record-1");
//! # Ok(())
//! # }
//! ```

pub mod column;
pub mod errors;
pub mod ids;
pub mod record;
pub mod request;
pub mod result;
pub mod schema;
pub mod study;

// Re-export commonly used types for convenience
pub use column::{column_names, ColumnDefinition, ColumnModel, ColumnType, TransferMethod};
pub use errors::{CohortError, TableStoreError};
pub use ids::{SchemaKey, StudyId};
pub use record::{ExportSubtask, ExportSubtaskBuilder, RecordAttributes, RecordMetadata};
pub use request::ExportRequest;
pub use result::Result;
pub use schema::{FieldDefinition, FieldType, UploadSchema, UploadSchemaBuilder};
pub use study::{RecordExporterStatus, StudyConfig};
