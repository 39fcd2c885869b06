//! Export request parameters
//!
//! The request that started a run. Schema lookups receive it so that the
//! directory can resolve schemas as of the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parameters of the request that started an export run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// End of the export window
    pub end_date_time: DateTime<Utc>,

    /// Whether the window starts at each study's last export time
    #[serde(default)]
    pub use_last_export_time: bool,

    /// Restrict the run to these studies (`None` = all)
    #[serde(default)]
    pub study_whitelist: Option<BTreeSet<String>>,

    /// Free-form tag for correlating runs in logs
    #[serde(default)]
    pub tag: Option<String>,
}

impl ExportRequest {
    /// Creates a request ending at the given instant
    pub fn new(end_date_time: DateTime<Utc>) -> Self {
        Self {
            end_date_time,
            use_last_export_time: false,
            study_whitelist: None,
            tag: None,
        }
    }

    /// Sets the last-export-time flag
    pub fn use_last_export_time(mut self, value: bool) -> Self {
        self.use_last_export_time = value;
        self
    }

    /// Sets the tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Whether the request covers the given study
    pub fn includes_study(&self, study_id: &str) -> bool {
        self.study_whitelist
            .as_ref()
            .map_or(true, |list| list.contains(study_id))
    }
}
