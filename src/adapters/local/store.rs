//! Filesystem-backed table store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<table_id>/table.json    table key, project and access grants
//! <root>/<table_id>/columns.json  column models
//! <root>/<table_id>/rows.tsv      every uploaded row, under the current columns
//! <root>/file-handles/<id>        uploaded attachments and text
//! ```
//!
//! Attachments and large text attachments are resolved by name from the
//! attachments directory.

use crate::adapters::traits::TableStore;
use crate::core::tsv::{decode_rows, encode_header, encode_row};
use crate::domain::{column_names, CohortError, ColumnModel, Result, TableStoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

const TABLE_FILE: &str = "table.json";
const COLUMNS_FILE: &str = "columns.json";
const ROWS_FILE: &str = "rows.tsv";
const FILE_HANDLES_DIR: &str = "file-handles";

/// Table metadata written on creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTableInfo {
    /// Logical table key
    pub table_key: String,
    /// Project holding the table
    pub project_id: String,
    /// Team with read access
    pub data_access_team_id: i64,
    /// Principal with administrative access
    pub admin_principal_id: i64,
}

/// Table store kept in a directory tree
#[derive(Debug, Clone)]
pub struct LocalTableStore {
    root: PathBuf,
    attachments: PathBuf,
}

impl LocalTableStore {
    /// Creates a store under `root`, resolving attachments from `attachments`
    pub fn new(root: impl Into<PathBuf>, attachments: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            attachments: attachments.into(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata of a table
    pub async fn table_info(&self, table_id: &str) -> Result<LocalTableInfo> {
        let path = self.table_dir(table_id)?.join(TABLE_FILE);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| TableStoreError::NotFound(table_id.to_string()))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Rows of a table, decoded, header first
    pub async fn read_rows(&self, table_id: &str) -> Result<Vec<Vec<Option<String>>>> {
        let path = self.table_dir(table_id)?.join(ROWS_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => decode_rows(&text).map_err(|message| {
                CohortError::from(TableStoreError::UploadFailed {
                    table_id: table_id.to_string(),
                    message,
                })
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn table_dir(&self, table_id: &str) -> Result<PathBuf> {
        if !is_plain_name(table_id) {
            return Err(TableStoreError::NotFound(table_id.to_string()).into());
        }
        Ok(self.root.join(table_id))
    }

    fn attachment_path(&self, reference: &str) -> Result<PathBuf> {
        if !is_plain_name(reference) {
            return Err(TableStoreError::AttachmentFailed {
                reference: reference.to_string(),
                message: "invalid attachment reference".to_string(),
            }
            .into());
        }
        Ok(self.attachments.join(reference))
    }

    async fn write_columns(&self, table_id: &str, columns: &[ColumnModel]) -> Result<()> {
        let path = self.table_dir(table_id)?.join(COLUMNS_FILE);
        tokio::fs::write(&path, serde_json::to_vec_pretty(columns)?).await?;
        Ok(())
    }

    async fn store_file_handle(&self, contents: &[u8]) -> Result<String> {
        let dir = self.root.join(FILE_HANDLES_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        let file_handle_id = format!("fh-{}", Uuid::new_v4().simple());
        tokio::fs::write(dir.join(&file_handle_id), contents).await?;
        Ok(file_handle_id)
    }
}

/// A single normal path component, so references cannot escape their directory
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl TableStore for LocalTableStore {
    async fn create_table_with_columns_and_acls(
        &self,
        columns: &[ColumnModel],
        data_access_team_id: i64,
        admin_principal_id: i64,
        project_id: &str,
        table_key: &str,
    ) -> Result<String> {
        let table_id = format!("tbl-{}", Uuid::new_v4().simple());
        let create_failed = |e: std::io::Error| TableStoreError::CreateTableFailed {
            key: table_key.to_string(),
            message: e.to_string(),
        };

        let dir = self.table_dir(&table_id)?;
        tokio::fs::create_dir_all(&dir).await.map_err(create_failed)?;

        let info = LocalTableInfo {
            table_key: table_key.to_string(),
            project_id: project_id.to_string(),
            data_access_team_id,
            admin_principal_id,
        };
        tokio::fs::write(dir.join(TABLE_FILE), serde_json::to_vec_pretty(&info)?)
            .await
            .map_err(create_failed)?;
        self.write_columns(&table_id, columns).await?;

        tracing::debug!(table_key, %table_id, root = %self.root.display(), "Created local table");
        Ok(table_id)
    }

    async fn get_column_models(&self, table_id: &str) -> Result<Vec<ColumnModel>> {
        let path = self.table_dir(table_id)?.join(COLUMNS_FILE);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            TableStoreError::ColumnFetchFailed {
                table_id: table_id.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn add_columns(&self, table_id: &str, columns: &[ColumnModel]) -> Result<()> {
        let mut existing = self.get_column_models(table_id).await?;
        for column in columns {
            if existing.iter().any(|c| c.name == column.name) {
                return Err(TableStoreError::AddColumnsFailed {
                    table_id: table_id.to_string(),
                    message: format!("column {} already exists", column.name),
                }
                .into());
            }
            existing.push(column.clone());
        }
        self.write_columns(table_id, &existing).await
    }

    async fn upload_tsv_file_to_table(
        &self,
        project_id: &str,
        table_id: &str,
        file: &Path,
    ) -> Result<u64> {
        let upload_failed = |message: String| TableStoreError::UploadFailed {
            table_id: table_id.to_string(),
            message,
        };

        let info = self.table_info(table_id).await?;
        if info.project_id != project_id {
            return Err(upload_failed(format!(
                "table belongs to project {}, not {}",
                info.project_id, project_id
            ))
            .into());
        }

        let columns = column_names(&self.get_column_models(table_id).await?);
        let staged = tokio::fs::read_to_string(file).await?;
        let mut staged_rows = decode_rows(&staged).map_err(upload_failed)?.into_iter();
        let header: Vec<String> = staged_rows
            .next()
            .ok_or_else(|| upload_failed("missing header".to_string()))?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        if let Some(unknown) = header.iter().find(|name| !columns.contains(name)) {
            return Err(upload_failed(format!("unknown column {unknown}")).into());
        }

        // Existing rows are re-laid under the current columns.
        let mut rows: Vec<HashMap<String, Option<String>>> = Vec::new();
        let mut existing = self.read_rows(table_id).await?.into_iter();
        if let Some(existing_header) = existing.next() {
            let existing_header: Vec<String> = existing_header
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect();
            rows.extend(existing.map(|row| existing_header.iter().cloned().zip(row).collect()));
        }

        let mut uploaded = 0u64;
        for row in staged_rows {
            rows.push(header.iter().cloned().zip(row).collect());
            uploaded += 1;
        }

        let mut text = encode_header(&columns);
        text.push('\n');
        for row in &rows {
            let values: Vec<Option<String>> = columns
                .iter()
                .map(|name| row.get(name).cloned().flatten())
                .collect();
            text.push_str(&encode_row(&values));
            text.push('\n');
        }
        tokio::fs::write(self.table_dir(table_id)?.join(ROWS_FILE), text).await?;

        Ok(uploaded)
    }

    async fn upload_attachment_to_file_handle(&self, source_ref: &str) -> Result<String> {
        let path = self.attachment_path(source_ref)?;
        let contents = tokio::fs::read(&path).await.map_err(|e| {
            TableStoreError::AttachmentFailed {
                reference: source_ref.to_string(),
                message: e.to_string(),
            }
        })?;
        self.store_file_handle(&contents).await
    }

    async fn upload_text_to_file_handle(&self, name: &str, text: &str) -> Result<String> {
        let file_handle_id = self.store_file_handle(text.as_bytes()).await?;
        tracing::debug!(name, %file_handle_id, "Stored text as file handle");
        Ok(file_handle_id)
    }

    async fn download_large_text_attachment(&self, attachment_id: &str) -> Result<String> {
        let path = self.attachment_path(attachment_id)?;
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            TableStoreError::AttachmentFailed {
                reference: attachment_id.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(text)
    }
}
