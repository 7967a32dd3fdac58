//! Batch uploads of study files.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use sf_config::UploadConfig;
use sf_core::entities::{FileRecord, Study};
use sf_core::errors::CoreError;
use sf_core::ids::{generate_file_id, storage_path};
use sf_remote::{DocumentStore, FileSource, FileTransfer, RemoteError, TransferProgress};
use sf_tasks::{RunError, run_bounded};

use crate::error::UploadError;
use crate::progress::AggregateProgress;

/// Receives the batch-wide percentage after every transfer tick.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Where uploaded files belong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub owner_id: String,
    pub study_id: String,
}

impl UploadTarget {
    pub fn new(owner_id: impl Into<String>, study_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            study_id: study_id.into(),
        }
    }
}

#[derive(Clone)]
pub struct UploadOptions {
    pub concurrency: usize,
    pub on_progress: Option<ProgressCallback>,
    /// The caller's current view of the study. When absent the document is
    /// read from the store before merging.
    pub snapshot: Option<Study>,
}

impl UploadOptions {
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            on_progress: None,
            snapshot: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, study: Study) -> Self {
        self.snapshot = Some(study);
        self
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for UploadOptions {
    fn from(config: &UploadConfig) -> Self {
        Self::new(config.concurrency)
    }
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("concurrency", &self.concurrency)
            .field("on_progress", &self.on_progress.is_some())
            .field("snapshot", &self.snapshot.as_ref().map(|s| &s.id))
            .finish()
    }
}

/// A file with its id and destination assigned, ready to transfer.
struct Planned {
    id: String,
    name: String,
    storage_path: String,
    size_bytes: u64,
    source: FileSource,
}

/// Uploads files for studies and keeps each study's `files` list current.
#[derive(Clone)]
pub struct UploadCoordinator {
    documents: Arc<dyn DocumentStore>,
    transfer: Arc<dyn FileTransfer>,
}

impl UploadCoordinator {
    pub fn new(documents: Arc<dyn DocumentStore>, transfer: Arc<dyn FileTransfer>) -> Self {
        Self {
            documents,
            transfer,
        }
    }

    /// Upload `files` with at most `options.concurrency` transfers in flight,
    /// then append their records to the study's `files` list.
    ///
    /// Only the `files` field is written; other fields of the study are left
    /// as the store has them. Records come back in input order.
    ///
    /// # Errors
    ///
    /// - [`UploadError::InvalidConcurrency`] if `options.concurrency` is zero
    /// - [`UploadError::Transfer`] for the first file that fails; nothing is
    ///   recorded on the study and already stored objects are left behind
    /// - [`UploadError::StudyNotFound`] if there is no snapshot and the store
    ///   has no such study
    pub async fn upload_all(
        &self,
        files: Vec<FileSource>,
        target: &UploadTarget,
        options: UploadOptions,
    ) -> Result<Vec<FileRecord>, UploadError> {
        if options.concurrency == 0 {
            return Err(UploadError::InvalidConcurrency);
        }

        let now = Utc::now();
        let mut planned = Vec::with_capacity(files.len());
        for source in files {
            let id = generate_file_id(now);
            let name = source.name();
            let size_bytes = source.size_bytes().await?;
            planned.push(Planned {
                storage_path: storage_path(&target.owner_id, &target.study_id, &id, &name),
                id,
                name,
                size_bytes,
                source,
            });
        }

        let sizes: Vec<u64> = planned.iter().map(|p| p.size_bytes).collect();
        let tracker = AggregateProgress::new(&sizes);
        let notify = options.on_progress.as_ref();

        if planned.is_empty() {
            if let Some(callback) = notify {
                callback(tracker.percent());
            }
            return Ok(Vec::new());
        }

        tracing::info!(
            study_id = %target.study_id,
            files = planned.len(),
            total_bytes = sizes.iter().sum::<u64>(),
            concurrency = options.concurrency,
            "upload started"
        );

        let transfer = &self.transfer;
        let tracker = &tracker;
        let tasks: Vec<_> = planned
            .iter()
            .enumerate()
            .map(move |(index, file)| {
                move || async move {
                    let report = move |tick: TransferProgress| {
                        let percent = tracker.update(index, tick.bytes_transferred);
                        if let Some(callback) = notify {
                            callback(percent);
                        }
                    };
                    let stored = transfer
                        .upload(&file.source, &file.storage_path, &report)
                        .await?;
                    tracing::debug!(file_id = %file.id, path = %stored.storage_path, "file stored");
                    Ok::<_, RemoteError>(FileRecord {
                        id: file.id.clone(),
                        name: file.name.clone(),
                        storage_path: stored.storage_path,
                        download_url: stored.download_url,
                        size_bytes: file.size_bytes,
                        uploaded_at: now,
                    })
                }
            })
            .collect();

        let records = run_bounded(tasks, options.concurrency)
            .await
            .map_err(|err| match err {
                RunError::InvalidConcurrency => UploadError::InvalidConcurrency,
                RunError::Task { index, source } => {
                    let name = planned
                        .get(index)
                        .map(|p| p.name.clone())
                        .unwrap_or_default();
                    tracing::warn!(study_id = %target.study_id, file = %name, error = %source, "upload failed");
                    UploadError::Transfer { name, source }
                }
            })?;

        let base = match options.snapshot {
            Some(study) => study,
            None => self.load(&target.study_id).await?,
        };
        let mut entries = file_entries(&base);
        for record in &records {
            entries.push(to_value(record)?);
        }
        self.write_files(&target.study_id, entries).await?;

        tracing::info!(study_id = %target.study_id, files = records.len(), "upload complete");
        Ok(records)
    }

    /// Delete a stored file and drop its record from the study.
    ///
    /// An object already missing from storage is not an error; the record is
    /// removed either way.
    ///
    /// # Errors
    ///
    /// - [`UploadError::StudyNotFound`] / [`UploadError::FileNotFound`]
    /// - [`UploadError::Remote`] if storage or the document write fails
    pub async fn remove_file(
        &self,
        study_id: &str,
        file_id: &str,
    ) -> Result<FileRecord, UploadError> {
        let study = self.load(study_id).await?;
        let mut entries = file_entries(&study);
        let (index, record) = find_record(&entries, study_id, file_id)?;

        match self.transfer.delete(&record.storage_path).await {
            Ok(()) | Err(RemoteError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        entries.remove(index);
        self.write_files(study_id, entries).await?;
        tracing::info!(study_id, file_id, "file removed");
        Ok(record)
    }

    /// Ask storage for a fresh download URL and record it on the study.
    ///
    /// # Errors
    ///
    /// - [`UploadError::StudyNotFound`] / [`UploadError::FileNotFound`]
    /// - [`UploadError::Remote`] if storage or the document write fails
    pub async fn refresh_download_url(
        &self,
        study_id: &str,
        file_id: &str,
    ) -> Result<String, UploadError> {
        let study = self.load(study_id).await?;
        let mut entries = file_entries(&study);
        let (index, record) = find_record(&entries, study_id, file_id)?;

        let url = self.transfer.download_url(&record.storage_path).await?;
        if url != record.download_url {
            if let Some(Value::Object(entry)) = entries.get_mut(index) {
                entry.insert("downloadUrl".to_string(), Value::String(url.clone()));
            }
            self.write_files(study_id, entries).await?;
        }
        Ok(url)
    }

    async fn load(&self, study_id: &str) -> Result<Study, UploadError> {
        let document = self
            .documents
            .get(study_id)
            .await?
            .ok_or_else(|| UploadError::StudyNotFound(study_id.to_string()))?;
        Ok(Study::from_document(document)?)
    }

    async fn write_files(&self, study_id: &str, entries: Vec<Value>) -> Result<(), UploadError> {
        let mut fields = Map::new();
        fields.insert("files".to_string(), Value::Array(entries));
        self.documents.update(study_id, fields).await?;
        Ok(())
    }
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator").finish_non_exhaustive()
    }
}

/// The raw `files` entries, including any this crate cannot parse.
fn file_entries(study: &Study) -> Vec<Value> {
    study
        .payload
        .get("files")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn find_record(
    entries: &[Value],
    study_id: &str,
    file_id: &str,
) -> Result<(usize, FileRecord), UploadError> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.get("id").and_then(Value::as_str) == Some(file_id))
        .find_map(|(index, entry)| {
            serde_json::from_value::<FileRecord>(entry.clone())
                .ok()
                .map(|record| (index, record))
        })
        .ok_or_else(|| UploadError::FileNotFound {
            study_id: study_id.to_string(),
            file_id: file_id.to_string(),
        })
}

fn to_value(record: &FileRecord) -> Result<Value, UploadError> {
    serde_json::to_value(record).map_err(|e| CoreError::Validation(e.to_string()).into())
}
