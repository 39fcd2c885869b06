//! TSV staging
//!
//! Each table that receives rows in a run gets one staged file in the task's
//! scratch directory, wrapped in a [`TsvInfo`] together with the row count, the
//! accepted record ids and the column names. The staged file is a
//! [`tempfile::NamedTempFile`]: it is deleted when the `TsvInfo` is released or
//! dropped, whichever comes first.

pub mod escape;

pub use escape::{decode_rows, encode_header, encode_row, escape_field};

use crate::domain::{CohortError, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Reduces a table key to characters safe for a file name (`[A-Za-z0-9_-]`)
pub fn sanitize_file_prefix(table_key: &str) -> String {
    table_key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Staged rows of one table in one run
#[derive(Debug)]
pub struct TsvInfo {
    column_names: Vec<String>,
    writer: BufWriter<NamedTempFile>,
    path: PathBuf,
    line_count: usize,
    record_ids: Vec<String>,
}

impl TsvInfo {
    /// Allocates the staged file and writes the header
    ///
    /// The file is named from the sanitized table key plus a random suffix,
    /// with a `.tsv` extension.
    pub fn create(dir: &Path, table_key: &str, column_names: Vec<String>) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(&sanitize_file_prefix(table_key))
            .suffix(".tsv")
            .tempfile_in(dir)?;
        let path = file.path().to_path_buf();

        let mut writer = BufWriter::new(file);
        writer.write_all(encode_header(&column_names).as_bytes())?;
        writer.write_all(b"\n")?;

        tracing::debug!(table_key, path = %path.display(), "Allocated staged TSV file");

        Ok(Self {
            column_names,
            writer,
            path,
            line_count: 0,
            record_ids: Vec::new(),
        })
    }

    /// Appends one row and records its record id
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not have one value per column or the
    /// write fails. Nothing is counted in either case.
    pub fn write_row(&mut self, values: &[Option<String>], record_id: &str) -> Result<()> {
        if values.len() != self.column_names.len() {
            return Err(CohortError::Other(format!(
                "Row for record {} has {} values but the table has {} columns",
                record_id,
                values.len(),
                self.column_names.len()
            )));
        }

        let mut line = encode_row(values);
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;

        self.line_count += 1;
        self.record_ids.push(record_id.to_string());
        Ok(())
    }

    /// Flushes buffered rows to the staged file
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Column names, in row order
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of data rows written
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Record ids of the rows written, in order
    pub fn record_ids(&self) -> &[String] {
        &self.record_ids
    }

    /// Path of the staged file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the staged file
    pub fn release(self) -> Result<()> {
        let path = self.path;
        let file: NamedTempFile = self
            .writer
            .into_inner()
            .map_err(|e| CohortError::Io(e.error().to_string()))?;
        file.close()?;
        tracing::debug!(path = %path.display(), "Released staged TSV file");
        Ok(())
    }

    /// Reads the staged file back, for inspection
    pub fn read_to_string(&mut self) -> Result<String> {
        self.flush()?;
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["recordId".to_string(), "foo".to_string()]
    }

    #[test]
    fn test_sanitize_file_prefix() {
        assert_eq!(
            sanitize_file_prefix("CAPITAL_lowercase_remove+ .!@#$between_123_with-dash"),
            "CAPITAL_lowercase_removebetween_123_with-dash"
        );
    }

    #[test]
    fn test_staged_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let info = TsvInfo::create(dir.path(), "my-study-my schema.v1", columns()).unwrap();
        let name = info.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("my-study-myschemav1"));
        assert!(name.ends_with(".tsv"));
        assert_eq!(info.path().parent().unwrap(), dir.path());
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = TsvInfo::create(dir.path(), "t", columns()).unwrap();
        info.write_row(&[Some("r1".to_string()), Some("a\"b".to_string())], "r1")
            .unwrap();
        info.write_row(&[Some("r2".to_string()), None], "r2").unwrap();

        let contents = info.read_to_string().unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![
            "\"recordId\"\t\"foo\"",
            "\"r1\"\t\"a\"\"b\"",
            "\"r2\"\t",
        ]);
        assert_eq!(info.line_count(), 2);
        assert_eq!(info.record_ids(), ["r1", "r2"]);
    }

    #[test]
    fn test_wrong_width_row_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = TsvInfo::create(dir.path(), "t", columns()).unwrap();
        assert!(info.write_row(&[Some("only-one".to_string())], "r1").is_err());
        assert_eq!(info.line_count(), 0);
        assert!(info.record_ids().is_empty());
    }

    #[test]
    fn test_release_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let info = TsvInfo::create(dir.path(), "t", columns()).unwrap();
        let path = info.path().to_path_buf();
        assert!(path.exists());
        info.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let info = TsvInfo::create(dir.path(), "t", columns()).unwrap();
        let path = info.path().to_path_buf();
        drop(info);
        assert!(!path.exists());
    }
}
