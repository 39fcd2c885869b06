//! Shared fakes and fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use cohort::adapters::local::FileStudyDirectory;
use cohort::adapters::memory::InMemoryTableIdCache;
use cohort::adapters::{TableIdCache, TableStore};
use cohort::core::handler::HandlerContext;
use cohort::core::provision::TableProvisioner;
use cohort::core::row::CommonColumns;
use cohort::core::serialize::FieldSerializer;
use cohort::core::task::ExportTask;
use cohort::core::tsv::decode_rows;
use cohort::domain::{
    ColumnDefinition, ColumnModel, ExportRequest, ExportSubtask, RecordAttributes, Result,
    SchemaKey, StudyConfig, StudyId, TableStoreError,
};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const ADMIN_PRINCIPAL_ID: i64 = 3336429;
pub const DATA_ACCESS_TEAM_ID: i64 = 1337;
pub const PROJECT_ID: &str = "test-project";
pub const UPLOAD_DATE: &str = "2015-10-31";
pub const LARGE_TEXT_ATTACHMENT_ID: &str = "my-large-text-attachment-id";
pub const LARGE_TEXT: &str = "This is my large text attachment";

/// A table as the fake store holds it
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTable {
    pub table_key: String,
    pub project_id: String,
    pub data_access_team_id: i64,
    pub admin_principal_id: i64,
    pub columns: Vec<ColumnModel>,
}

/// One bulk upload, captured at upload time
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub project_id: String,
    pub table_id: String,
    pub contents: String,
}

impl Upload {
    /// Header and rows of the uploaded file
    pub fn rows(&self) -> Vec<Vec<Option<String>>> {
        decode_rows(&self.contents).expect("uploaded file decodes")
    }

    /// Column names from the header
    pub fn header(&self) -> Vec<String> {
        self.rows()[0]
            .iter()
            .map(|name| name.clone().unwrap_or_default())
            .collect()
    }

    /// Data rows without the header
    pub fn data_rows(&self) -> Vec<Vec<Option<String>>> {
        self.rows().into_iter().skip(1).collect()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    next_table: usize,
    tables: BTreeMap<String, StoredTable>,
    created_keys: Vec<String>,
    added_columns: Vec<(String, Vec<ColumnModel>)>,
    uploads: Vec<Upload>,
    text_uploads: Vec<(String, String)>,
    failing_uploads: HashSet<String>,
    failing_creates: HashSet<String>,
    failing_column_fetches: HashSet<String>,
    failing_column_adds: HashSet<String>,
    calls: usize,
}

/// Table store that records every call
#[derive(Debug, Default)]
pub struct RecordingTableStore {
    state: Mutex<StoreState>,
}

impl RecordingTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing table
    pub fn with_table(self, table_id: &str, table_key: &str, columns: Vec<ColumnModel>) -> Self {
        self.state.lock().unwrap().tables.insert(
            table_id.to_string(),
            StoredTable {
                table_key: table_key.to_string(),
                project_id: PROJECT_ID.to_string(),
                data_access_team_id: DATA_ACCESS_TEAM_ID,
                admin_principal_id: ADMIN_PRINCIPAL_ID,
                columns,
            },
        );
        self
    }

    /// Makes every upload to `table_id` fail
    pub fn fail_uploads_to(&self, table_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(table_id.to_string());
    }

    /// Makes creating the table for `table_key` fail
    pub fn fail_creates_for(&self, table_key: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_creates
            .insert(table_key.to_string());
    }

    /// Makes fetching the columns of `table_id` fail
    pub fn fail_column_fetches_for(&self, table_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_column_fetches
            .insert(table_id.to_string());
    }

    /// Makes adding columns to `table_id` fail
    pub fn fail_column_adds_to(&self, table_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_column_adds
            .insert(table_id.to_string());
    }

    /// Number of store calls of any kind
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn created_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().created_keys.clone()
    }

    pub fn table(&self, table_id: &str) -> Option<StoredTable> {
        self.state.lock().unwrap().tables.get(table_id).cloned()
    }

    pub fn added_columns(&self) -> Vec<(String, Vec<ColumnModel>)> {
        self.state.lock().unwrap().added_columns.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// The single upload to a table
    pub fn upload_to(&self, table_id: &str) -> Upload {
        let uploads: Vec<Upload> = self
            .uploads()
            .into_iter()
            .filter(|u| u.table_id == table_id)
            .collect();
        assert_eq!(uploads.len(), 1, "expected one upload to {table_id}");
        uploads[0].clone()
    }

    pub fn text_uploads(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().text_uploads.clone()
    }
}

#[async_trait]
impl TableStore for RecordingTableStore {
    async fn create_table_with_columns_and_acls(
        &self,
        columns: &[ColumnModel],
        data_access_team_id: i64,
        admin_principal_id: i64,
        project_id: &str,
        table_key: &str,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.failing_creates.contains(table_key) {
            return Err(TableStoreError::CreateTableFailed {
                key: table_key.to_string(),
                message: "simulated create failure".to_string(),
            }
            .into());
        }
        state.next_table += 1;
        let table_id = format!("table-{}", state.next_table);
        state.tables.insert(
            table_id.clone(),
            StoredTable {
                table_key: table_key.to_string(),
                project_id: project_id.to_string(),
                data_access_team_id,
                admin_principal_id,
                columns: columns.to_vec(),
            },
        );
        state.created_keys.push(table_key.to_string());
        Ok(table_id)
    }

    async fn get_column_models(&self, table_id: &str) -> Result<Vec<ColumnModel>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.failing_column_fetches.contains(table_id) {
            return Err(TableStoreError::ColumnFetchFailed {
                table_id: table_id.to_string(),
                message: "simulated column fetch failure".to_string(),
            }
            .into());
        }
        state
            .tables
            .get(table_id)
            .map(|t| t.columns.clone())
            .ok_or_else(|| TableStoreError::NotFound(table_id.to_string()).into())
    }

    async fn add_columns(&self, table_id: &str, columns: &[ColumnModel]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.failing_column_adds.contains(table_id) {
            return Err(TableStoreError::AddColumnsFailed {
                table_id: table_id.to_string(),
                message: "simulated column add failure".to_string(),
            }
            .into());
        }
        let table = state
            .tables
            .get_mut(table_id)
            .ok_or_else(|| TableStoreError::NotFound(table_id.to_string()))?;
        table.columns.extend(columns.iter().cloned());
        state
            .added_columns
            .push((table_id.to_string(), columns.to_vec()));
        Ok(())
    }

    async fn upload_tsv_file_to_table(
        &self,
        project_id: &str,
        table_id: &str,
        file: &Path,
    ) -> Result<u64> {
        let contents = std::fs::read_to_string(file)?;
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.failing_uploads.contains(table_id) {
            return Err(TableStoreError::UploadFailed {
                table_id: table_id.to_string(),
                message: "simulated upload failure".to_string(),
            }
            .into());
        }
        let rows = contents.lines().count().saturating_sub(1) as u64;
        state.uploads.push(Upload {
            project_id: project_id.to_string(),
            table_id: table_id.to_string(),
            contents,
        });
        Ok(rows)
    }

    async fn upload_attachment_to_file_handle(&self, source_ref: &str) -> Result<String> {
        self.state.lock().unwrap().calls += 1;
        if source_ref == "missing" {
            return Err(TableStoreError::AttachmentFailed {
                reference: source_ref.to_string(),
                message: "no such attachment".to_string(),
            }
            .into());
        }
        Ok(format!("fh-{source_ref}"))
    }

    async fn upload_text_to_file_handle(&self, name: &str, text: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.text_uploads.push((name.to_string(), text.to_string()));
        Ok(format!("fh-text-{name}"))
    }

    async fn download_large_text_attachment(&self, attachment_id: &str) -> Result<String> {
        self.state.lock().unwrap().calls += 1;
        if attachment_id == LARGE_TEXT_ATTACHMENT_ID {
            Ok(LARGE_TEXT.to_string())
        } else {
            Err(TableStoreError::NotFound(attachment_id.to_string()).into())
        }
    }
}

/// Collaborators of one test run
pub struct Harness {
    pub store: Arc<RecordingTableStore>,
    pub directory: Arc<FileStudyDirectory>,
    pub context: Arc<HandlerContext>,
}

/// Builder for [`Harness`]
pub struct HarnessBuilder {
    store: RecordingTableStore,
    directory: FileStudyDirectory,
    cache: Arc<dyn TableIdCache>,
    columns: Vec<ColumnDefinition>,
    dry_run: bool,
    large_text_threshold: usize,
}

impl HarnessBuilder {
    pub fn store(mut self, store: RecordingTableStore) -> Self {
        self.store = store;
        self
    }

    pub fn study(mut self, study: StudyConfig) -> Self {
        self.directory.add_study(study);
        self
    }

    pub fn schema(mut self, schema: cohort::domain::UploadSchema) -> Self {
        self.directory.add_schema(schema);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn TableIdCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn common_columns(mut self, columns: Vec<ColumnDefinition>) -> Self {
        self.columns = columns;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn large_text_threshold(mut self, threshold: usize) -> Self {
        self.large_text_threshold = threshold;
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(self.store);
        let directory = Arc::new(self.directory);
        let store_dyn: Arc<dyn TableStore> = store.clone();
        let context = Arc::new(HandlerContext {
            directory: directory.clone(),
            store: store_dyn.clone(),
            provisioner: TableProvisioner::new(
                store_dyn.clone(),
                self.cache,
                ADMIN_PRINCIPAL_ID,
                "",
            ),
            serializer: FieldSerializer::new(store_dyn, self.large_text_threshold),
            common_columns: CommonColumns::new(self.columns),
            dry_run: self.dry_run,
        });
        Harness {
            store,
            directory,
            context,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            store: RecordingTableStore::new(),
            directory: FileStudyDirectory::default(),
            cache: Arc::new(InMemoryTableIdCache::new()),
            columns: Vec::new(),
            dry_run: false,
            large_text_threshold: 1000,
        }
    }
}

pub fn study_id(id: &str) -> StudyId {
    StudyId::new(id).unwrap()
}

pub fn study(id: &str) -> StudyConfig {
    StudyConfig {
        study_id: study_id(id),
        project_id: PROJECT_ID.to_string(),
        data_access_team_id: DATA_ACCESS_TEAM_ID,
        excluded: false,
        study_id_excluded_in_export: false,
    }
}

pub fn schema_key(study: &str, schema: &str, revision: u32) -> SchemaKey {
    SchemaKey::new(study_id(study), schema, revision).unwrap()
}

pub fn task() -> ExportTask {
    ExportTask::builder()
        .exporter_date(NaiveDate::from_ymd_opt(2015, 10, 31).unwrap())
        .request(ExportRequest::new(
            Utc.with_ymd_and_hms(2015, 11, 1, 0, 0, 0).unwrap(),
        ))
        .build()
        .unwrap()
}

/// Subtask with the given record id and payload
pub fn subtask(
    study: &str,
    record_id: &str,
    schema_key: Option<SchemaKey>,
    record_json: &str,
) -> ExportSubtask {
    subtask_with(
        study,
        RecordAttributes::new().with_string("id", record_id),
        schema_key,
        record_json,
    )
}

pub fn subtask_with(
    study: &str,
    attributes: RecordAttributes,
    schema_key: Option<SchemaKey>,
    record_json: &str,
) -> ExportSubtask {
    ExportSubtask::builder()
        .attributes(attributes)
        .record_json(record_json)
        .schema_key(schema_key)
        .study_id(study_id(study))
        .build()
        .unwrap()
}

/// The four leading cells every row starts with
pub fn common_values(
    record_id: &str,
    app_version: Option<&str>,
    phone_info: Option<&str>,
) -> Vec<Option<String>> {
    vec![
        Some(record_id.to_string()),
        app_version.map(String::from),
        phone_info.map(String::from),
        Some(UPLOAD_DATE.to_string()),
    ]
}

pub fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(String::from)).collect()
}
