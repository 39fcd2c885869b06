//! Common columns
//!
//! Every row starts with the same columns, whatever table it goes to: four
//! fixed ones (`recordId`, `appVersion`, `phoneInfo`, `uploadDate`) followed by
//! the deployment's configured [`ColumnDefinition`]s. Their values come from
//! the record attributes, flattened according to each definition's
//! [`TransferMethod`].

pub mod sanitize;

pub use sanitize::strip_html;

use crate::domain::{
    ColumnDefinition, ColumnModel, ExportSubtask, RecordAttributes, TransferMethod,
};
use chrono::NaiveDate;
use serde_json::Value;

/// Record id column
pub const COLUMN_RECORD_ID: &str = "recordId";
/// App version column, from the record metadata
pub const COLUMN_APP_VERSION: &str = "appVersion";
/// Phone info column, from the record metadata
pub const COLUMN_PHONE_INFO: &str = "phoneInfo";
/// Export date column
pub const COLUMN_UPLOAD_DATE: &str = "uploadDate";

const RECORD_ID_LENGTH: u32 = 36;
const APP_VERSION_LENGTH: u32 = 48;
const PHONE_INFO_LENGTH: u32 = 48;
const UPLOAD_DATE_LENGTH: u32 = 10;

/// The common columns of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonColumns {
    definitions: Vec<ColumnDefinition>,
}

impl CommonColumns {
    /// Creates the common columns from the configured definitions
    pub fn new(definitions: Vec<ColumnDefinition>) -> Self {
        Self { definitions }
    }

    /// Configured definitions
    pub fn definitions(&self) -> &[ColumnDefinition] {
        &self.definitions
    }

    /// Number of common columns, fixed ones included
    pub fn column_count(&self) -> usize {
        4 + self.definitions.len()
    }

    /// Column models, in row order
    pub fn columns(&self) -> Vec<ColumnModel> {
        let mut columns = vec![
            ColumnModel::string(COLUMN_RECORD_ID, RECORD_ID_LENGTH),
            ColumnModel::string(COLUMN_APP_VERSION, APP_VERSION_LENGTH),
            ColumnModel::string(COLUMN_PHONE_INFO, PHONE_INFO_LENGTH),
            ColumnModel::string(COLUMN_UPLOAD_DATE, UPLOAD_DATE_LENGTH),
        ];
        columns.extend(self.definitions.iter().map(ColumnDefinition::to_column_model));
        columns
    }

    /// Values for one record, in row order
    pub fn values(&self, subtask: &ExportSubtask, exporter_date: NaiveDate) -> Vec<Option<String>> {
        let attributes = &subtask.attributes;
        let metadata = attributes.metadata();

        let mut values = vec![
            attributes
                .record_id()
                .map(|id| truncate(id, RECORD_ID_LENGTH)),
            metadata
                .app_version
                .as_deref()
                .map(|v| truncate(v, APP_VERSION_LENGTH)),
            metadata
                .phone_info
                .as_deref()
                .map(|v| truncate(v, PHONE_INFO_LENGTH)),
            Some(exporter_date.format("%Y-%m-%d").to_string()),
        ];
        values.extend(
            self.definitions
                .iter()
                .map(|definition| transfer(definition, attributes)),
        );
        values
    }
}

/// Flattens one attribute according to its definition
///
/// Absent attributes and values that do not fit the transfer method yield
/// `None`.
pub fn transfer(definition: &ColumnDefinition, attributes: &RecordAttributes) -> Option<String> {
    let value = attributes.get(definition.source_name())?;

    let flattened = match definition.transfer_method {
        TransferMethod::String => match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        },
        TransferMethod::StringSet => flatten_string_set(value),
        TransferMethod::StringMap => flatten_string_map(value),
        TransferMethod::Date => match value {
            Value::Number(n) => n.as_i64().map(|millis| millis.to_string()),
            Value::String(s) => s.trim().parse::<i64>().ok().map(|millis| millis.to_string()),
            _ => None,
        },
    }?;

    if definition.transfer_method == TransferMethod::Date {
        return Some(flattened);
    }

    let flattened = if definition.sanitize {
        strip_html(&flattened)
    } else {
        flattened
    };
    Some(truncate(&flattened, definition.max_size))
}

fn flatten_string_set(value: &Value) -> Option<String> {
    let mut items: Vec<String> = value
        .as_array()?
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    if items.is_empty() {
        return None;
    }
    items.sort();
    items.dedup();
    Some(items.join(","))
}

fn flatten_string_map(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    if map.is_empty() {
        return None;
    }
    let mut entries: Vec<(&String, String)> = map
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, v)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut flattened = String::from("|");
    for (k, v) in entries {
        flattened.push_str(k);
        flattened.push('=');
        flattened.push_str(&v);
        flattened.push('|');
    }
    Some(flattened)
}

fn truncate(value: &str, max_length: u32) -> String {
    value.chars().take(max_length as usize).collect()
}
