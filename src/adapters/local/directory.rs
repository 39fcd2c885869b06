//! Study directory backed by a TOML catalog file
//!
//! ```toml
//! [[studies]]
//! study_id = "my-study"
//! project_id = "proj-1"
//! data_access_team_id = 1337
//!
//! [[schemas]]
//! study_id = "my-study"
//! schema_id = "my-schema"
//! revision = 1
//!
//! [[schemas.field_definitions]]
//! name = "foo"
//! type = "STRING"
//! max_length = 20
//! ```
//!
//! Exporter status updates are kept in memory and logged.

use crate::adapters::traits::StudyDirectory;
use crate::domain::{
    CohortError, ExportRequest, FieldDefinition, RecordExporterStatus, Result, SchemaKey,
    StudyConfig, StudyId, UploadSchema,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Default, Deserialize)]
struct Catalog {
    #[serde(default)]
    studies: Vec<StudyConfig>,
    #[serde(default)]
    schemas: Vec<CatalogSchema>,
}

#[derive(Debug, Deserialize)]
struct CatalogSchema {
    study_id: StudyId,
    schema_id: String,
    revision: u32,
    #[serde(default)]
    field_definitions: Vec<FieldDefinition>,
}

/// Study directory read from a catalog file
#[derive(Debug, Default)]
pub struct FileStudyDirectory {
    studies: HashMap<StudyId, StudyConfig>,
    schemas: HashMap<SchemaKey, UploadSchema>,
    exporter_status: Mutex<BTreeMap<String, RecordExporterStatus>>,
}

impl FileStudyDirectory {
    /// Loads a catalog file
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed, or
    /// if it holds an invalid schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CohortError::Configuration(format!(
                "Failed to read catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let directory = Self::from_toml(&contents)?;
        tracing::info!(
            path = %path.display(),
            studies = directory.studies.len(),
            schemas = directory.schemas.len(),
            "Loaded study catalog"
        );
        Ok(directory)
    }

    /// Parses catalog text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(contents)?;
        let mut directory = Self::default();
        for study in catalog.studies {
            directory.add_study(study);
        }
        for entry in catalog.schemas {
            let key = SchemaKey::new(entry.study_id, entry.schema_id, entry.revision)
                .map_err(CohortError::Configuration)?;
            let schema = entry
                .field_definitions
                .into_iter()
                .fold(UploadSchema::builder(key), |builder, field| builder.field(field))
                .build()
                .map_err(CohortError::Configuration)?;
            directory.add_schema(schema);
        }
        Ok(directory)
    }

    /// Adds or replaces a study
    pub fn add_study(&mut self, study: StudyConfig) {
        self.studies.insert(study.study_id.clone(), study);
    }

    /// Adds or replaces a schema
    pub fn add_schema(&mut self, schema: UploadSchema) {
        self.schemas.insert(schema.key.clone(), schema);
    }

    /// Last exporter status reported for a record
    pub fn exporter_status(&self, record_id: &str) -> Option<RecordExporterStatus> {
        self.exporter_status
            .lock()
            .ok()
            .and_then(|statuses| statuses.get(record_id).copied())
    }
}

#[async_trait]
impl StudyDirectory for FileStudyDirectory {
    async fn get_study(&self, study_id: &StudyId) -> Result<StudyConfig> {
        self.studies
            .get(study_id)
            .cloned()
            .ok_or_else(|| CohortError::Study(format!("Study {study_id} not found in catalog")))
    }

    async fn get_schema(&self, _request: &ExportRequest, key: &SchemaKey) -> Result<UploadSchema> {
        self.schemas
            .get(key)
            .cloned()
            .ok_or_else(|| CohortError::Schema(format!("Schema {key} not found in catalog")))
    }

    async fn update_record_exporter_status(
        &self,
        record_ids: &[String],
        status: RecordExporterStatus,
    ) -> Result<()> {
        let mut statuses = self
            .exporter_status
            .lock()
            .map_err(|e| CohortError::Study(format!("Exporter status lock poisoned: {e}")))?;
        for record_id in record_ids {
            statuses.insert(record_id.clone(), status);
        }
        tracing::info!(records = record_ids.len(), %status, "Updated record exporter status");
        Ok(())
    }
}
