//! Upload schema model
//!
//! A schema is an ordered list of [`FieldDefinition`]s. The type serialization
//! engine expands each field into one or more table columns.

use super::ids::SchemaKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a schema field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Plain string, bounded unless the field is marked unbounded
    String,
    /// Integer
    Int,
    /// Floating point number
    Float,
    /// Boolean
    Boolean,
    /// Calendar date (`YYYY-MM-DD`)
    CalendarDate,
    /// Instant with timezone, exported as epoch millis plus an offset column
    Timestamp,
    /// Set of answers from a fixed vocabulary
    MultiChoice,
    /// Free-form content uploaded as a file handle
    Attachment,
    /// Reference to text held by the large-text store, inlined on export
    LargeTextAttachment,
    /// Any type this exporter does not know how to serialize
    Unsupported(String),
}

impl FieldType {
    /// Wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "STRING",
            FieldType::Int => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::CalendarDate => "CALENDAR_DATE",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::MultiChoice => "MULTI_CHOICE",
            FieldType::Attachment => "ATTACHMENT",
            FieldType::LargeTextAttachment => "LARGE_TEXT_ATTACHMENT",
            FieldType::Unsupported(name) => name,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "STRING" => FieldType::String,
            "INT" => FieldType::Int,
            "FLOAT" => FieldType::Float,
            "BOOLEAN" => FieldType::Boolean,
            "CALENDAR_DATE" => FieldType::CalendarDate,
            "TIMESTAMP" => FieldType::Timestamp,
            "MULTI_CHOICE" => FieldType::MultiChoice,
            "ATTACHMENT" | "ATTACHMENT_V2" | "FREEFORM_TEXT" => FieldType::Attachment,
            "LARGE_TEXT_ATTACHMENT" => FieldType::LargeTextAttachment,
            _ => FieldType::Unsupported(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One field of an upload schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, also the (first) column name
    pub name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Maximum length for bounded strings
    #[serde(default)]
    pub max_length: Option<u32>,

    /// Strings of unbounded length
    #[serde(default)]
    pub unbounded_text: bool,

    /// Answer vocabulary for MULTI_CHOICE fields
    #[serde(default)]
    pub multi_choice_answer_list: Vec<String>,

    /// Whether a MULTI_CHOICE field accepts answers outside its vocabulary
    #[serde(default)]
    pub allow_other_choices: bool,
}

impl FieldDefinition {
    /// Creates a field with default options
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            max_length: None,
            unbounded_text: false,
            multi_choice_answer_list: Vec::new(),
            allow_other_choices: false,
        }
    }

    /// Sets the maximum length
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Marks the field as unbounded text
    pub fn unbounded_text(mut self, unbounded: bool) -> Self {
        self.unbounded_text = unbounded;
        self
    }

    /// Sets the MULTI_CHOICE vocabulary
    pub fn multi_choice_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.multi_choice_answer_list = answers.into_iter().map(Into::into).collect();
        self
    }

    /// Allows answers outside the MULTI_CHOICE vocabulary
    pub fn allow_other_choices(mut self, allow: bool) -> Self {
        self.allow_other_choices = allow;
        self
    }
}

/// An upload schema revision and its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSchema {
    /// Schema key
    pub key: SchemaKey,

    /// Ordered field definitions
    pub field_definitions: Vec<FieldDefinition>,
}

impl UploadSchema {
    /// Creates a builder for the given key
    pub fn builder(key: SchemaKey) -> UploadSchemaBuilder {
        UploadSchemaBuilder {
            key,
            field_definitions: Vec::new(),
        }
    }
}

/// Builder for constructing UploadSchema instances
#[derive(Debug)]
pub struct UploadSchemaBuilder {
    key: SchemaKey,
    field_definitions: Vec<FieldDefinition>,
}

impl UploadSchemaBuilder {
    /// Adds a field with default options
    pub fn add_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field_definitions
            .push(FieldDefinition::new(name, field_type));
        self
    }

    /// Adds a fully specified field
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.field_definitions.push(field);
        self
    }

    /// Builds the UploadSchema
    ///
    /// # Errors
    ///
    /// Returns an error if two fields share a name.
    pub fn build(self) -> Result<UploadSchema, String> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.field_definitions {
            if !seen.insert(field.name.as_str()) {
                return Err(format!(
                    "Duplicate field '{}' in schema {}",
                    field.name, self.key
                ));
            }
        }
        Ok(UploadSchema {
            key: self.key,
            field_definitions: self.field_definitions,
        })
    }
}
