//! Timestamp parsing for TIMESTAMP fields

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses a timestamp into epoch milliseconds and a `+hhmm` offset
///
/// Accepts ISO-8601 text with or without seconds and with `Z`, `+09:00` or
/// `+0900` offsets; text without an offset is taken as UTC. A JSON number is
/// taken as epoch milliseconds in UTC.
pub fn parse_timestamp(value: &Value) -> Option<(i64, String)> {
    match value {
        Value::Number(n) => n.as_i64().map(|millis| (millis, "+0000".to_string())),
        Value::String(s) => parse_timestamp_str(s.trim())
            .map(|dt| (dt.timestamp_millis(), dt.format("%z").to_string())),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let with_offset = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(stripped) => format!("{stripped}+0000"),
        None => s.to_string(),
    };
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&with_offset, fmt).ok())
    {
        return Some(dt);
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    // 2016-06-09T06:54:00Z
    const SUBMIT_MILLIS: i64 = 1_465_455_240_000;

    #[test_case("2016-06-09T15:54+0900", SUBMIT_MILLIS, "+0900"; "minutes with compact offset")]
    #[test_case("2016-06-09T15:54:00+09:00", SUBMIT_MILLIS, "+0900"; "rfc3339")]
    #[test_case("2016-06-09T15:54+09:00", SUBMIT_MILLIS, "+0900"; "minutes with colon offset")]
    #[test_case("2016-06-09T06:54:00.000Z", SUBMIT_MILLIS, "+0000"; "utc with millis")]
    #[test_case("2016-06-09T06:54Z", SUBMIT_MILLIS, "+0000"; "utc without seconds")]
    #[test_case("2016-06-09T06:54:00", SUBMIT_MILLIS, "+0000"; "no offset is utc")]
    #[test_case("2016-06-08T21:54-0900", SUBMIT_MILLIS, "-0900"; "negative offset")]
    fn test_parse_timestamp_text(input: &str, millis: i64, offset: &str) {
        assert_eq!(
            parse_timestamp(&json!(input)),
            Some((millis, offset.to_string()))
        );
    }

    #[test]
    fn test_parse_timestamp_epoch_millis() {
        assert_eq!(
            parse_timestamp(&json!(SUBMIT_MILLIS)),
            Some((SUBMIT_MILLIS, "+0000".to_string()))
        );
    }

    #[test_case(json!("not a timestamp"); "garbage text")]
    #[test_case(json!("2016-13-45T99:99"); "out of range")]
    #[test_case(json!(true); "boolean")]
    #[test_case(json!(["2016-06-09T15:54+0900"]); "array")]
    fn test_parse_timestamp_invalid(input: Value) {
        assert_eq!(parse_timestamp(&input), None);
    }
}
