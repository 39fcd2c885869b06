//! Input records
//!
//! An [`ExportSubtask`] binds one input record to a run. The record arrives as
//! two parts: its attributes (record-level metadata such as the health code or
//! the data groups, a loosely typed key/value document) and its raw data payload,
//! which is kept as text and only parsed when a handler builds the row.

use super::errors::CohortError;
use super::ids::{SchemaKey, StudyId};
use super::result::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Attribute holding the record identifier
pub const ATTR_RECORD_ID: &str = "id";
/// Attribute holding the metadata JSON blob (app version, phone info)
pub const ATTR_METADATA: &str = "metadata";
/// Attribute holding the raw data attachment identifier
pub const ATTR_RAW_DATA_ATTACHMENT_ID: &str = "rawDataAttachmentId";

/// Record-level attributes of one input record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordAttributes(Map<String, Value>);

impl RecordAttributes {
    /// Creates an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a string attribute
    pub fn with_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), Value::String(value.into()));
        self
    }

    /// Sets a numeric attribute
    pub fn with_long(mut self, name: impl Into<String>, value: i64) -> Self {
        self.0.insert(name.into(), Value::from(value));
        self
    }

    /// Sets a string-set attribute
    pub fn with_string_set<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        self.0.insert(
            name.into(),
            Value::Array(set.into_iter().map(Value::String).collect()),
        );
        self
    }

    /// Sets a string-map attribute
    pub fn with_map<I, K, V>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let object = map
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>();
        self.0.insert(name.into(), Value::Object(object));
        self
    }

    /// Returns the raw value of an attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Returns a string attribute
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Record identifier
    pub fn record_id(&self) -> Option<&str> {
        self.get_str(ATTR_RECORD_ID)
    }

    /// Raw data attachment identifier, if the record has one
    pub fn raw_data_attachment_id(&self) -> Option<&str> {
        self.get_str(ATTR_RAW_DATA_ATTACHMENT_ID)
            .filter(|s| !s.is_empty())
    }

    /// Parses the metadata blob
    ///
    /// The blob may be stored as JSON text or as an object. A malformed blob
    /// yields empty metadata.
    pub fn metadata(&self) -> RecordMetadata {
        let parsed = match self.get(ATTR_METADATA) {
            Some(Value::String(text)) => serde_json::from_str::<RecordMetadata>(text),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone()),
            _ => return RecordMetadata::default(),
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!(
                record_id = self.record_id().unwrap_or("unknown"),
                error = %e,
                "Malformed record metadata"
            );
            RecordMetadata::default()
        })
    }
}

impl From<Map<String, Value>> for RecordAttributes {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Client metadata carried by a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Application version string reported by the client
    #[serde(default)]
    pub app_version: Option<String>,

    /// Phone / device description reported by the client
    #[serde(default)]
    pub phone_info: Option<String>,
}

/// One input record bound to an export run
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSubtask {
    /// Record-level attributes
    pub attributes: RecordAttributes,

    /// Raw record payload, expected to be a JSON object
    pub record_json: String,

    /// Schema of the payload; `None` for schemaless records
    pub schema_key: Option<SchemaKey>,

    /// Owning study
    pub study_id: StudyId,
}

impl ExportSubtask {
    /// Creates a new builder
    pub fn builder() -> ExportSubtaskBuilder {
        ExportSubtaskBuilder::default()
    }

    /// Record identifier, empty when the record carries none
    pub fn record_id(&self) -> &str {
        self.attributes.record_id().unwrap_or_default()
    }

    /// Parses the raw payload into a JSON object
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::RecordContent`] carrying the raw payload when it is
    /// not a JSON object.
    pub fn record_data(&self) -> Result<Map<String, Value>> {
        match serde_json::from_str::<Value>(&self.record_json) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(CohortError::RecordContent(self.record_json.clone())),
        }
    }
}

/// Builder for constructing ExportSubtask instances
#[derive(Debug, Default)]
pub struct ExportSubtaskBuilder {
    attributes: Option<RecordAttributes>,
    record_json: Option<String>,
    schema_key: Option<SchemaKey>,
    study_id: Option<StudyId>,
}

impl ExportSubtaskBuilder {
    /// Sets the record attributes
    pub fn attributes(mut self, attributes: RecordAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Sets the raw record payload
    pub fn record_json(mut self, record_json: impl Into<String>) -> Self {
        self.record_json = Some(record_json.into());
        self
    }

    /// Sets the schema key
    pub fn schema_key(mut self, schema_key: Option<SchemaKey>) -> Self {
        self.schema_key = schema_key;
        self
    }

    /// Sets the study ID
    pub fn study_id(mut self, study_id: StudyId) -> Self {
        self.study_id = Some(study_id);
        self
    }

    /// Builds the ExportSubtask
    ///
    /// # Errors
    ///
    /// Returns an error if any required field is missing
    pub fn build(self) -> std::result::Result<ExportSubtask, String> {
        Ok(ExportSubtask {
            attributes: self.attributes.ok_or("attributes are required")?,
            record_json: self.record_json.ok_or("record_json is required")?,
            schema_key: self.schema_key,
            study_id: self.study_id.ok_or("study_id is required")?,
        })
    }
}
