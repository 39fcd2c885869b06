//! Type serialization engine
//!
//! Expands schema fields into table columns and encodes raw field values into
//! the matching cells. Encoding never fails for a single field: a value that
//! cannot be converted is exported as an empty cell and logged. Each field
//! always yields exactly as many cells as it has columns.
//!
//! | Field type | Columns |
//! |---|---|
//! | STRING | `name` (STRING, or LARGETEXT when unbounded or longer than 1000) |
//! | INT | `name` (INTEGER) |
//! | FLOAT | `name` (DOUBLE) |
//! | BOOLEAN | `name` (BOOLEAN) |
//! | CALENDAR_DATE | `name` (STRING 10) |
//! | TIMESTAMP | `name` (DATE), `name.timezone` (STRING 5) |
//! | MULTI_CHOICE | `name.<answer>` (BOOLEAN) per answer, `name.other` if other answers are allowed |
//! | ATTACHMENT | `name` (FILEHANDLEID) |
//! | LARGE_TEXT_ATTACHMENT | `name` (LARGETEXT) |
//! | anything else | `name` (STRING), always empty |

pub mod timestamp;

pub use timestamp::parse_timestamp;

use crate::adapters::TableStore;
use crate::core::task::{Metrics, LARGE_TEXT_ATTACHMENT_COUNTER};
use crate::domain::{ColumnModel, ColumnType, FieldDefinition, FieldType};
use crate::log_field_degraded;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Maximum length of a STRING field that does not declare one
pub const DEFAULT_MAX_LENGTH: u32 = 100;

/// Longest bounded STRING column; longer fields become LARGETEXT
pub const MAX_STRING_COLUMN_LENGTH: u32 = 1000;

/// Width of the `.timezone` column of a TIMESTAMP field
pub const TIMEZONE_COLUMN_LENGTH: u32 = 5;

/// Width of a CALENDAR_DATE column
pub const CALENDAR_DATE_LENGTH: u32 = 10;

/// Returns the columns a field expands to, in order
pub fn columns_for_field(field: &FieldDefinition) -> Vec<ColumnModel> {
    let name = field.name.as_str();
    match &field.field_type {
        FieldType::String => {
            let max_length = field.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
            if field.unbounded_text || max_length > MAX_STRING_COLUMN_LENGTH {
                vec![ColumnModel::new(name, ColumnType::LargeText)]
            } else {
                vec![ColumnModel::string(name, max_length)]
            }
        }
        FieldType::Int => vec![ColumnModel::new(name, ColumnType::Integer)],
        FieldType::Float => vec![ColumnModel::new(name, ColumnType::Double)],
        FieldType::Boolean => vec![ColumnModel::new(name, ColumnType::Boolean)],
        FieldType::CalendarDate => vec![ColumnModel::string(name, CALENDAR_DATE_LENGTH)],
        FieldType::Timestamp => vec![
            ColumnModel::new(name, ColumnType::Date),
            ColumnModel::string(format!("{name}.timezone"), TIMEZONE_COLUMN_LENGTH),
        ],
        FieldType::MultiChoice => {
            let mut columns: Vec<ColumnModel> = field
                .multi_choice_answer_list
                .iter()
                .map(|answer| ColumnModel::new(format!("{name}.{answer}"), ColumnType::Boolean))
                .collect();
            if field.allow_other_choices {
                columns.push(ColumnModel::string(
                    format!("{name}.other"),
                    field.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
                ));
            }
            columns
        }
        FieldType::Attachment => vec![ColumnModel::new(name, ColumnType::FileHandleId)],
        FieldType::LargeTextAttachment => vec![ColumnModel::new(name, ColumnType::LargeText)],
        FieldType::Unsupported(_) => vec![ColumnModel::string(name, DEFAULT_MAX_LENGTH)],
    }
}

/// Returns the columns of a whole field list, in order
pub fn columns_for_fields(fields: &[FieldDefinition]) -> Vec<ColumnModel> {
    fields.iter().flat_map(columns_for_field).collect()
}

/// Encodes field values into cells
///
/// Holds the table store used to resolve attachments.
#[derive(Clone)]
pub struct FieldSerializer {
    store: Arc<dyn TableStore>,
    large_text_threshold: usize,
}

impl FieldSerializer {
    /// Creates a serializer
    ///
    /// Unbounded strings longer than `large_text_threshold` characters are
    /// uploaded as file handles instead of being written inline.
    pub fn new(store: Arc<dyn TableStore>, large_text_threshold: usize) -> Self {
        Self {
            store,
            large_text_threshold,
        }
    }

    /// Encodes every field of `fields` from the record data, in column order
    pub async fn serialize_fields(
        &self,
        fields: &[FieldDefinition],
        data: &Map<String, Value>,
        metrics: &mut Metrics,
    ) -> Vec<Option<String>> {
        let mut values = Vec::new();
        for field in fields {
            values.extend(self.serialize_field(field, data.get(&field.name), metrics).await);
        }
        values
    }

    /// Encodes one field
    ///
    /// Always returns one cell per column of [`columns_for_field`].
    pub async fn serialize_field(
        &self,
        field: &FieldDefinition,
        value: Option<&Value>,
        metrics: &mut Metrics,
    ) -> Vec<Option<String>> {
        let width = columns_for_field(field).len();
        let value = match value {
            None | Some(Value::Null) => return vec![None; width],
            Some(value) => value,
        };

        match &field.field_type {
            FieldType::String => vec![self.serialize_string(field, value, metrics).await],
            FieldType::Int => vec![serialize_int(field, value)],
            FieldType::Float => vec![serialize_float(field, value)],
            FieldType::Boolean => vec![serialize_boolean(field, value)],
            FieldType::CalendarDate => vec![serialize_calendar_date(field, value)],
            FieldType::Timestamp => match parse_timestamp(value) {
                Some((millis, offset)) => vec![Some(millis.to_string()), Some(offset)],
                None => {
                    log_field_degraded!(field.name, "unparsable timestamp");
                    vec![None, None]
                }
            },
            FieldType::MultiChoice => serialize_multi_choice(field, value),
            FieldType::Attachment => vec![self.serialize_attachment(field, value).await],
            FieldType::LargeTextAttachment => {
                vec![self.serialize_large_text_attachment(field, value).await]
            }
            FieldType::Unsupported(type_name) => {
                log_field_degraded!(field.name, format!("unsupported type {type_name}"));
                vec![None]
            }
        }
    }

    async fn serialize_string(
        &self,
        field: &FieldDefinition,
        value: &Value,
        metrics: &mut Metrics,
    ) -> Option<String> {
        let text = value_as_text(value);

        if field.unbounded_text {
            if text.chars().count() <= self.large_text_threshold {
                return Some(text);
            }
            return match self.store.upload_text_to_file_handle(&field.name, &text).await {
                Ok(file_handle_id) => {
                    metrics.increment_counter(LARGE_TEXT_ATTACHMENT_COUNTER);
                    Some(file_handle_id)
                }
                Err(e) => {
                    log_field_degraded!(field.name, format!("large text upload failed: {e}"));
                    None
                }
            };
        }

        let max_length = field.max_length.unwrap_or(DEFAULT_MAX_LENGTH) as usize;
        Some(truncate(&field.name, text, max_length))
    }

    async fn serialize_attachment(&self, field: &FieldDefinition, value: &Value) -> Option<String> {
        let Some(source_ref) = value.as_str() else {
            log_field_degraded!(field.name, "attachment reference is not a string");
            return None;
        };
        match self.store.upload_attachment_to_file_handle(source_ref).await {
            Ok(file_handle_id) => Some(file_handle_id),
            Err(e) => {
                log_field_degraded!(field.name, format!("attachment upload failed: {e}"));
                None
            }
        }
    }

    async fn serialize_large_text_attachment(
        &self,
        field: &FieldDefinition,
        value: &Value,
    ) -> Option<String> {
        let Some(attachment_id) = value.as_str() else {
            log_field_degraded!(field.name, "large text attachment id is not a string");
            return None;
        };
        match self.store.download_large_text_attachment(attachment_id).await {
            Ok(text) => Some(text),
            Err(e) => {
                log_field_degraded!(field.name, format!("large text download failed: {e}"));
                None
            }
        }
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(field_name: &str, text: String, max_length: usize) -> String {
    match text.char_indices().nth(max_length) {
        Some((cut, _)) => {
            tracing::debug!(
                field = field_name,
                max_length,
                "Truncating string value"
            );
            text[..cut].to_string()
        }
        None => text,
    }
}

fn serialize_int(field: &FieldDefinition, value: &Value) -> Option<String> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        log_field_degraded!(field.name, "not an integer");
    }
    parsed.map(|n| n.to_string())
}

fn serialize_float(field: &FieldDefinition, value: &Value) -> Option<String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    if parsed.is_none() {
        log_field_degraded!(field.name, "not a number");
    }
    parsed.map(|f| f.to_string())
}

fn serialize_boolean(field: &FieldDefinition, value: &Value) -> Option<String> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    };
    if parsed.is_none() {
        log_field_degraded!(field.name, "not a boolean");
    }
    parsed.map(|b| b.to_string())
}

fn serialize_calendar_date(field: &FieldDefinition, value: &Value) -> Option<String> {
    let parsed = value.as_str().and_then(|s| {
        let s = s.trim();
        s.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    });
    if parsed.is_none() {
        log_field_degraded!(field.name, "not a calendar date");
    }
    parsed.map(|d| d.format("%Y-%m-%d").to_string())
}

fn serialize_multi_choice(field: &FieldDefinition, value: &Value) -> Vec<Option<String>> {
    let width = field.multi_choice_answer_list.len() + usize::from(field.allow_other_choices);
    let Some(selected) = value.as_array() else {
        log_field_degraded!(field.name, "multi-choice answer is not a list");
        return vec![None; width];
    };
    let selected: Vec<String> = selected.iter().map(value_as_text).collect();

    let mut values: Vec<Option<String>> = field
        .multi_choice_answer_list
        .iter()
        .map(|answer| Some(selected.contains(answer).to_string()))
        .collect();

    if field.allow_other_choices {
        let other = selected
            .iter()
            .find(|answer| !field.multi_choice_answer_list.contains(*answer))
            .cloned();
        values.push(other);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnModel, Result, TableStoreError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::Path;
    use test_case::test_case;

    struct AttachmentStore;

    #[async_trait]
    impl TableStore for AttachmentStore {
        async fn create_table_with_columns_and_acls(
            &self,
            _: &[ColumnModel],
            _: i64,
            _: i64,
            _: &str,
            _: &str,
        ) -> Result<String> {
            unimplemented!()
        }

        async fn get_column_models(&self, _: &str) -> Result<Vec<ColumnModel>> {
            unimplemented!()
        }

        async fn add_columns(&self, _: &str, _: &[ColumnModel]) -> Result<()> {
            unimplemented!()
        }

        async fn upload_tsv_file_to_table(&self, _: &str, _: &str, _: &Path) -> Result<u64> {
            unimplemented!()
        }

        async fn upload_attachment_to_file_handle(&self, source_ref: &str) -> Result<String> {
            match source_ref {
                "missing" => Err(TableStoreError::AttachmentFailed {
                    reference: source_ref.to_string(),
                    message: "no such attachment".to_string(),
                }
                .into()),
                other => Ok(format!("fh-{other}")),
            }
        }

        async fn upload_text_to_file_handle(&self, name: &str, _: &str) -> Result<String> {
            Ok(format!("fh-text-{name}"))
        }

        async fn download_large_text_attachment(&self, attachment_id: &str) -> Result<String> {
            match attachment_id {
                "my-large-text-attachment-id" => Ok("This is my large text attachment".to_string()),
                other => Err(TableStoreError::NotFound(other.to_string()).into()),
            }
        }
    }

    fn serializer(threshold: usize) -> FieldSerializer {
        FieldSerializer::new(Arc::new(AttachmentStore), threshold)
    }

    async fn serialize(field: &FieldDefinition, value: Value) -> Vec<Option<String>> {
        let mut metrics = Metrics::new();
        serializer(1000)
            .serialize_field(field, Some(&value), &mut metrics)
            .await
    }

    fn sports() -> FieldDefinition {
        FieldDefinition::new("sports", FieldType::MultiChoice)
            .multi_choice_answers(["fencing", "football", "running", "swimming"])
    }

    #[test]
    fn test_columns_for_strings() {
        let short = FieldDefinition::new("foo", FieldType::String).max_length(20);
        assert_eq!(columns_for_field(&short), vec![ColumnModel::string("foo", 20)]);

        let default = FieldDefinition::new("foo", FieldType::String);
        assert_eq!(columns_for_field(&default), vec![ColumnModel::string("foo", 100)]);

        let long = FieldDefinition::new("foooo", FieldType::String).max_length(9999);
        assert_eq!(
            columns_for_field(&long),
            vec![ColumnModel::new("foooo", ColumnType::LargeText)]
        );

        let unbounded = FieldDefinition::new("unbounded-foo", FieldType::String).unbounded_text(true);
        assert_eq!(
            columns_for_field(&unbounded)[0].column_type,
            ColumnType::LargeText
        );
    }

    #[test]
    fn test_columns_for_timestamp() {
        let field = FieldDefinition::new("submitTime", FieldType::Timestamp);
        assert_eq!(
            columns_for_field(&field),
            vec![
                ColumnModel::new("submitTime", ColumnType::Date),
                ColumnModel::string("submitTime.timezone", 5),
            ]
        );
    }

    #[test]
    fn test_columns_for_multi_choice_with_other() {
        let field = FieldDefinition::new("delicious", FieldType::MultiChoice)
            .multi_choice_answers(["Yes", "No"])
            .allow_other_choices(true);
        let names: Vec<String> = columns_for_field(&field).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["delicious.Yes", "delicious.No", "delicious.other"]);
    }

    #[test]
    fn test_columns_for_fields_is_concatenation() {
        let fields = vec![
            FieldDefinition::new("foo", FieldType::String),
            FieldDefinition::new("submitTime", FieldType::Timestamp),
            sports(),
        ];
        assert_eq!(columns_for_fields(&fields).len(), 1 + 2 + 4);
    }

    #[tokio::test]
    async fn test_multi_choice_membership() {
        let values = serialize(&sports(), json!(["fencing", "running"])).await;
        assert_eq!(
            values,
            vec![
                Some("true".to_string()),
                Some("false".to_string()),
                Some("true".to_string()),
                Some("false".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_multi_choice_other_takes_first_unknown() {
        let field = FieldDefinition::new("delicious", FieldType::MultiChoice)
            .multi_choice_answers(["Yes", "No"])
            .allow_other_choices(true);
        let values = serialize(&field, json!(["Yes", "No", "Maybe", "Sometimes"])).await;
        assert_eq!(
            values,
            vec![
                Some("true".to_string()),
                Some("true".to_string()),
                Some("Maybe".to_string()),
            ]
        );

        let values = serialize(&field, json!(["No"])).await;
        assert_eq!(values[2], None);
    }

    #[tokio::test]
    async fn test_multi_choice_not_a_list() {
        let values = serialize(&sports(), json!("fencing")).await;
        assert_eq!(values, vec![None; 4]);
    }

    #[test_case(json!(42), Some("42"); "integer")]
    #[test_case(json!("17"), Some("17"); "numeric string")]
    #[test_case(json!(3.9), Some("3"); "float is truncated")]
    #[test_case(json!("forty-two"), None; "non numeric")]
    #[test_case(json!([1]), None; "array")]
    #[tokio::test]
    async fn test_int_encoding(input: Value, expected: Option<&str>) {
        let field = FieldDefinition::new("bar", FieldType::Int);
        assert_eq!(serialize(&field, input).await, vec![expected.map(String::from)]);
    }

    #[test_case(json!(true), Some("true"); "bool")]
    #[test_case(json!("FALSE"), Some("false"); "string")]
    #[test_case(json!(1), None; "number")]
    #[tokio::test]
    async fn test_boolean_encoding(input: Value, expected: Option<&str>) {
        let field = FieldDefinition::new("flag", FieldType::Boolean);
        assert_eq!(serialize(&field, input).await, vec![expected.map(String::from)]);
    }

    #[test_case(json!(2.5), Some("2.5"); "number")]
    #[test_case(json!("0.25"), Some("0.25"); "string")]
    #[test_case(json!("NaN"), None; "nan")]
    #[tokio::test]
    async fn test_float_encoding(input: Value, expected: Option<&str>) {
        let field = FieldDefinition::new("score", FieldType::Float);
        assert_eq!(serialize(&field, input).await, vec![expected.map(String::from)]);
    }

    #[test_case(json!("2016-06-09"), Some("2016-06-09"); "date")]
    #[test_case(json!("2016-06-09T15:54+0900"), Some("2016-06-09"); "date time prefix")]
    #[test_case(json!("June 9th"), None; "garbage")]
    #[tokio::test]
    async fn test_calendar_date_encoding(input: Value, expected: Option<&str>) {
        let field = FieldDefinition::new("day", FieldType::CalendarDate);
        assert_eq!(serialize(&field, input).await, vec![expected.map(String::from)]);
    }

    #[tokio::test]
    async fn test_timestamp_encoding() {
        let field = FieldDefinition::new("submitTime", FieldType::Timestamp);
        let values = serialize(&field, json!("2016-06-09T15:54+0900")).await;
        assert_eq!(
            values,
            vec![Some("1465455240000".to_string()), Some("+0900".to_string())]
        );

        let values = serialize(&field, json!("yesterday")).await;
        assert_eq!(values, vec![None, None]);
    }

    #[tokio::test]
    async fn test_string_truncation() {
        let field = FieldDefinition::new("foo", FieldType::String).max_length(5);
        assert_eq!(
            serialize(&field, json!("abcdefgh")).await,
            vec![Some("abcde".to_string())]
        );
        assert_eq!(
            serialize(&field, json!("ünïcødé")).await,
            vec![Some("ünïcø".to_string())]
        );
    }

    #[tokio::test]
    async fn test_string_from_non_string_value() {
        let field = FieldDefinition::new("foo", FieldType::String);
        assert_eq!(serialize(&field, json!(42)).await, vec![Some("42".to_string())]);
    }

    #[tokio::test]
    async fn test_unbounded_string_within_threshold_is_inline() {
        let field = FieldDefinition::new("notes", FieldType::String).unbounded_text(true);
        let text = "x".repeat(2000);
        let mut metrics = Metrics::new();
        let values = serializer(5000)
            .serialize_field(&field, Some(&json!(text.clone())), &mut metrics)
            .await;
        assert_eq!(values, vec![Some(text)]);
        assert_eq!(metrics.counter(LARGE_TEXT_ATTACHMENT_COUNTER), 0);
    }

    #[tokio::test]
    async fn test_oversize_unbounded_string_becomes_file_handle() {
        let field = FieldDefinition::new("notes", FieldType::String).unbounded_text(true);
        let mut metrics = Metrics::new();
        let values = serializer(10)
            .serialize_field(&field, Some(&json!("longer than ten characters")), &mut metrics)
            .await;
        assert_eq!(values, vec![Some("fh-text-notes".to_string())]);
        assert_eq!(metrics.counter(LARGE_TEXT_ATTACHMENT_COUNTER), 1);
    }

    #[tokio::test]
    async fn test_attachment_upload() {
        let field = FieldDefinition::new("audio", FieldType::Attachment);
        assert_eq!(
            serialize(&field, json!("audio.m4a")).await,
            vec![Some("fh-audio.m4a".to_string())]
        );
    }

    #[tokio::test]
    async fn test_attachment_failure_is_empty() {
        let field = FieldDefinition::new("audio", FieldType::Attachment);
        assert_eq!(serialize(&field, json!("missing")).await, vec![None]);
    }

    #[tokio::test]
    async fn test_large_text_attachment_is_inlined() {
        let field = FieldDefinition::new("my-large-text-attachment", FieldType::LargeTextAttachment);
        assert_eq!(
            serialize(&field, json!("my-large-text-attachment-id")).await,
            vec![Some("This is my large text attachment".to_string())]
        );
        assert_eq!(serialize(&field, json!("unknown-id")).await, vec![None]);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_empty() {
        let field = FieldDefinition::new("where", FieldType::Unsupported("GEOLOCATION".to_string()));
        assert_eq!(serialize(&field, json!({"lat": 1.0})).await, vec![None]);
    }

    #[tokio::test]
    async fn test_absent_value_keeps_width() {
        let field = FieldDefinition::new("delicious", FieldType::MultiChoice)
            .multi_choice_answers(["Yes", "No"])
            .allow_other_choices(true);
        let mut metrics = Metrics::new();
        let values = serializer(1000)
            .serialize_field(&field, None, &mut metrics)
            .await;
        assert_eq!(values, vec![None, None, None]);

        let values = serializer(1000)
            .serialize_field(&field, Some(&Value::Null), &mut metrics)
            .await;
        assert_eq!(values.len(), 3);
    }

    #[tokio::test]
    async fn test_serialize_fields_follows_column_order() {
        let fields = vec![
            FieldDefinition::new("foo", FieldType::String),
            FieldDefinition::new("bar", FieldType::Int),
        ];
        let data = json!({"foo": "This is a string.", "bar": 42});
        let mut metrics = Metrics::new();
        let values = serializer(1000)
            .serialize_fields(&fields, data.as_object().unwrap(), &mut metrics)
            .await;
        assert_eq!(
            values,
            vec![Some("This is a string.".to_string()), Some("42".to_string())]
        );
    }
}
