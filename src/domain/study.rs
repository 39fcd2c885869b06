//! Study configuration as seen by the exporter

use super::ids::StudyId;
use serde::{Deserialize, Serialize};

/// Per-study export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Study identifier
    pub study_id: StudyId,

    /// Project that holds the study's tables
    pub project_id: String,

    /// Team granted read access on created tables
    pub data_access_team_id: i64,

    /// Skip the study's app-version rows
    #[serde(default)]
    pub excluded: bool,

    /// Drop the study prefix from table names recorded in app-version rows
    #[serde(default)]
    pub study_id_excluded_in_export: bool,
}

/// Export status reported back for records after a successful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordExporterStatus {
    /// Rows were uploaded to the table store
    Succeeded,
    /// Upload was attempted but failed
    Failed,
}

impl std::fmt::Display for RecordExporterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordExporterStatus::Succeeded => write!(f, "SUCCEEDED"),
            RecordExporterStatus::Failed => write!(f, "FAILED"),
        }
    }
}
