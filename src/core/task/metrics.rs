//! Per-run metrics sink
//!
//! Counters are keyed by name (`<table key>.lineCount`, `<table key>.errorCount`,
//! ...). Key/value sets collect distinct values per key, e.g. the application
//! versions seen for each study.

use std::collections::{BTreeMap, BTreeSet};

/// Counter suffix for rows written to a table
pub const LINE_COUNT_SUFFIX: &str = "lineCount";
/// Counter suffix for records that failed for a table
pub const ERROR_COUNT_SUFFIX: &str = "errorCount";
/// Counter suffix for rows the table store reported as processed
pub const UPLOADED_ROWS_SUFFIX: &str = "uploadedRowCount";
/// Counter for unbounded strings uploaded as file handles
pub const LARGE_TEXT_ATTACHMENT_COUNTER: &str = "largeTextAttachmentCount";

/// Metrics collected over one export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<String, u64>,
    key_values: BTreeMap<String, BTreeSet<String>>,
}

impl Metrics {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments a counter by one
    pub fn increment_counter(&mut self, name: &str) {
        self.add_to_counter(name, 1);
    }

    /// Adds `delta` to a counter
    pub fn add_to_counter(&mut self, name: &str, delta: u64) {
        *self.counters.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Current value of a counter, zero if never touched
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// All counters
    pub fn counters(&self) -> &BTreeMap<String, u64> {
        &self.counters
    }

    /// Adds a value to the set kept under `key`
    pub fn add_key_value(&mut self, key: &str, value: impl Into<String>) {
        self.key_values
            .entry(key.to_string())
            .or_default()
            .insert(value.into());
    }

    /// Values collected under `key`
    pub fn key_values(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.key_values.get(key)
    }

    /// All key/value sets
    pub fn all_key_values(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.key_values
    }

    /// Logs every counter and key/value set
    pub fn log_summary(&self) {
        for (name, value) in &self.counters {
            tracing::info!(metric = %name, value = value, "Counter");
        }
        for (key, values) in &self.key_values {
            let joined = values.iter().cloned().collect::<Vec<_>>().join(", ");
            tracing::info!(metric = %key, values = %joined, "Distinct values");
        }
    }
}

/// Name of a per-table counter
pub fn table_counter(table_key: &str, suffix: &str) -> String {
    format!("{table_key}.{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut metrics = Metrics::new();
        assert_eq!(metrics.counter("t.lineCount"), 0);

        metrics.increment_counter("t.lineCount");
        metrics.increment_counter("t.lineCount");
        metrics.add_to_counter("t.uploadedRowCount", 40);

        assert_eq!(metrics.counter("t.lineCount"), 2);
        assert_eq!(metrics.counter("t.uploadedRowCount"), 40);
        assert_eq!(metrics.counters().len(), 2);
    }

    #[test]
    fn test_key_values_are_distinct() {
        let mut metrics = Metrics::new();
        metrics.add_key_value("uniqueAppVersions[my-study]", "1.0");
        metrics.add_key_value("uniqueAppVersions[my-study]", "1.0");
        metrics.add_key_value("uniqueAppVersions[my-study]", "2.0");

        let values = metrics.key_values("uniqueAppVersions[my-study]").unwrap();
        assert_eq!(values.len(), 2);
        assert!(metrics.key_values("uniqueAppVersions[other]").is_none());
    }

    #[test]
    fn test_table_counter_name() {
        assert_eq!(
            table_counter("my-study-my-schema-v1", LINE_COUNT_SUFFIX),
            "my-study-my-schema-v1.lineCount"
        );
    }
}
