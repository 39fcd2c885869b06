//! Domain identifier types with validation
//!
//! Newtype wrappers for study and schema identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Study identifier newtype wrapper
///
/// # Examples
///
/// ```
/// use cohort::domain::ids::StudyId;
/// use std::str::FromStr;
///
/// let study_id = StudyId::from_str("my-study").unwrap();
/// assert_eq!(study_id.as_str(), "my-study");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudyId(String);

impl StudyId {
    /// Creates a new StudyId from a string
    ///
    /// Returns `Err` if the identifier is empty or blank.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Study ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the study ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StudyId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StudyId> for String {
    fn from(id: StudyId) -> Self {
        id.0
    }
}

impl AsRef<str> for StudyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key of one revision of an upload schema
///
/// Renders as `{study}-{schema}-v{revision}`, which is also the logical table
/// key of the schema's table.
///
/// # Examples
///
/// ```
/// use cohort::domain::ids::{SchemaKey, StudyId};
///
/// let key = SchemaKey::new(StudyId::new("my-study").unwrap(), "my-schema", 1).unwrap();
/// assert_eq!(key.to_string(), "my-study-my-schema-v1");
/// assert_eq!(key.schema_id_and_revision(), "my-schema-v1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaKey {
    /// Study that owns the schema
    pub study_id: StudyId,

    /// Schema identifier, unique within the study
    pub schema_id: String,

    /// Schema revision
    pub revision: u32,
}

impl SchemaKey {
    /// Creates a new SchemaKey
    pub fn new(study_id: StudyId, schema_id: impl Into<String>, revision: u32) -> Result<Self, String> {
        let schema_id = schema_id.into();
        if schema_id.trim().is_empty() {
            return Err("Schema ID cannot be empty".to_string());
        }
        Ok(Self {
            study_id,
            schema_id,
            revision,
        })
    }

    /// Renders the key without the study prefix, e.g. `my-schema-v1`
    pub fn schema_id_and_revision(&self) -> String {
        format!("{}-v{}", self.schema_id, self.revision)
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-v{}", self.study_id, self.schema_id, self.revision)
    }
}
