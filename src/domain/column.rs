//! Table column descriptors
//!
//! A [`ColumnModel`] is what the table store knows about a column. Column
//! reconciliation compares models by name only: existing columns are never
//! retyped or removed.
//!
//! A [`ColumnDefinition`] describes a common column: one that every table gets,
//! filled from record attributes rather than from the record payload.

use serde::{Deserialize, Serialize};

/// Column types understood by the table store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    /// Bounded string, needs a maximum size
    String,
    /// Unbounded text
    LargeText,
    /// 64-bit integer
    Integer,
    /// Floating point number
    Double,
    /// Boolean
    Boolean,
    /// Epoch milliseconds
    Date,
    /// Reference to an uploaded file handle
    FileHandleId,
}

/// Descriptor of one table column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnModel {
    /// Column name, unique within a table
    pub name: String,

    /// Column type
    pub column_type: ColumnType,

    /// Maximum size, only meaningful for [`ColumnType::String`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_size: Option<u32>,
}

impl ColumnModel {
    /// Creates a column without a maximum size
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            maximum_size: None,
        }
    }

    /// Creates a bounded string column
    pub fn string(name: impl Into<String>, maximum_size: u32) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::String,
            maximum_size: Some(maximum_size),
        }
    }
}

/// How a common column's source attribute is flattened into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferMethod {
    /// Plain string
    #[default]
    String,
    /// Set of strings, sorted and comma-joined
    StringSet,
    /// String map, rendered as `|k=v|k=v|` sorted by key
    StringMap,
    /// Epoch milliseconds
    Date,
}

/// Descriptor of a common column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Output column name
    pub name: String,

    /// Source attribute name; defaults to `name`
    #[serde(default)]
    pub ddb_name: Option<String>,

    /// Maximum size of string-like values
    #[serde(default = "default_max_size")]
    pub max_size: u32,

    /// Flattening rule
    #[serde(default)]
    pub transfer_method: TransferMethod,

    /// Strip HTML markup from the value
    #[serde(default)]
    pub sanitize: bool,
}

impl ColumnDefinition {
    /// Creates a STRING definition with the default maximum size
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ddb_name: None,
            max_size: default_max_size(),
            transfer_method: TransferMethod::String,
            sanitize: false,
        }
    }

    /// Sets the source attribute name
    pub fn ddb_name(mut self, ddb_name: impl Into<String>) -> Self {
        self.ddb_name = Some(ddb_name.into());
        self
    }

    /// Sets the maximum size
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the transfer method
    pub fn transfer_method(mut self, transfer_method: TransferMethod) -> Self {
        self.transfer_method = transfer_method;
        self
    }

    /// Enables HTML sanitizing
    pub fn sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Attribute the value is read from
    pub fn source_name(&self) -> &str {
        self.ddb_name.as_deref().unwrap_or(&self.name)
    }

    /// Table column for this definition
    pub fn to_column_model(&self) -> ColumnModel {
        match self.transfer_method {
            TransferMethod::Date => ColumnModel::new(&self.name, ColumnType::Date),
            _ => ColumnModel::string(&self.name, self.max_size),
        }
    }
}

fn default_max_size() -> u32 {
    100
}

/// Returns the names of the given columns, in order
pub fn column_names(columns: &[ColumnModel]) -> Vec<String> {
    columns.iter().map(|c| c.name.clone()).collect()
}
