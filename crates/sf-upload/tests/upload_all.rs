//! Batch uploads against the in-memory document store and object storage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use sf_core::entities::Study;
use sf_remote::{
    FileSource, FileTransfer, FsFileTransfer, MemoryDocumentStore, MemoryFileTransfer,
    RemoteError, StoredObject,
};
use sf_remote::transfer::ProgressFn;
use sf_upload::{UploadCoordinator, UploadError, UploadOptions, UploadTarget};

const STUDY: &str = "stu-0001";
const OWNER: &str = "usr-1";
const KB: usize = 1024;

fn seeded_store() -> MemoryDocumentStore {
    let store = MemoryDocumentStore::new();
    let mut study = Study::new(STUDY, OWNER, Utc::now());
    study.payload.insert("assets".into(), json!([{ "name": "boiler" }]));
    study.payload.insert(
        "files".into(),
        json!([{ "id": "fil-legacy", "name": "floorplan.pdf" }]),
    );
    store.insert(study.to_document().unwrap()).unwrap();
    store
}

fn target() -> UploadTarget {
    UploadTarget::new(OWNER, STUDY)
}

fn skewed_batch() -> Vec<FileSource> {
    vec![
        FileSource::memory("survey.mp4", vec![0u8; 10 * KB]),
        FileSource::memory("kitchen.jpg", vec![1u8; KB]),
        FileSource::memory("garage.jpg", vec![2u8; KB]),
    ]
}

fn recorder() -> (Arc<Mutex<Vec<u8>>>, impl Fn(u8) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |pct| sink.lock().unwrap().push(pct))
}

#[tokio::test(start_paused = true)]
async fn skewed_sizes_report_weighted_progress() {
    let store = seeded_store();
    let transfer = MemoryFileTransfer::new()
        .with_chunk_bytes(KB)
        .with_tick_delay(Duration::from_millis(10));
    let coordinator = UploadCoordinator::new(Arc::new(store), Arc::new(transfer));
    let (seen, on_progress) = recorder();

    coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(3).with_progress(on_progress))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    // Both photos done and the video half way: 7 of 12 KiB.
    assert!(seen.contains(&58), "progress was {seen:?}");
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {seen:?}");
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn records_come_back_in_input_order() {
    let store = seeded_store();
    let transfer = MemoryFileTransfer::new();
    let coordinator = UploadCoordinator::new(Arc::new(store), Arc::new(transfer.clone()));

    let records = coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(2))
        .await
        .unwrap();

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["survey.mp4", "kitchen.jpg", "garage.jpg"]);
    assert_eq!(records[0].size_bytes, 10 * KB as u64);
    for record in &records {
        assert!(record.id.starts_with("fil-"));
        assert!(
            record
                .storage_path
                .starts_with(&format!("studies/{OWNER}/{STUDY}/{}-", record.id))
        );
        assert_eq!(record.download_url, format!("mem://studyflow/{}", record.storage_path));
        assert!(transfer.contains(&record.storage_path));
    }
}

#[tokio::test]
async fn appends_to_files_and_writes_nothing_else() {
    let store = seeded_store();
    let coordinator =
        UploadCoordinator::new(Arc::new(store.clone()), Arc::new(MemoryFileTransfer::new()));

    coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::default())
        .await
        .unwrap();

    let log = store.update_log();
    assert_eq!(log.len(), 1);
    let (id, fields) = &log[0];
    assert_eq!(id, STUDY);
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["files"]);

    let document = store.document(STUDY).unwrap();
    let files = document["files"].as_array().unwrap();
    assert_eq!(files.len(), 4);
    assert_eq!(files[0]["id"], "fil-legacy");
    assert_eq!(files[1]["name"], "survey.mp4");
    assert_eq!(document["assets"], json!([{ "name": "boiler" }]));
}

#[tokio::test]
async fn merges_onto_the_callers_snapshot() {
    let store = seeded_store();
    let coordinator =
        UploadCoordinator::new(Arc::new(store.clone()), Arc::new(MemoryFileTransfer::new()));

    let mut snapshot = Study::new(STUDY, OWNER, Utc::now());
    snapshot.payload.insert(
        "files".into(),
        json!([{ "id": "fil-local", "name": "notes.txt" }]),
    );

    coordinator
        .upload_all(
            vec![FileSource::memory("roof.jpg", vec![7u8; 10])],
            &target(),
            UploadOptions::new(1).with_snapshot(snapshot),
        )
        .await
        .unwrap();

    let files = store.document(STUDY).unwrap()["files"].clone();
    let ids: Vec<_> = files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["notes.txt", "roof.jpg"]);
}

#[tokio::test]
async fn one_failure_aborts_the_batch() {
    let store = seeded_store();
    let transfer = MemoryFileTransfer::new();
    transfer.fail_uploads_named("kitchen.jpg");
    let coordinator = UploadCoordinator::new(Arc::new(store.clone()), Arc::new(transfer));

    let err = coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(1))
        .await
        .unwrap_err();

    match err {
        UploadError::Transfer { name, source } => {
            assert_eq!(name, "kitchen.jpg");
            assert!(matches!(source, RemoteError::Transport(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.update_log().is_empty());
}

#[tokio::test]
async fn zero_concurrency_uploads_nothing() {
    let store = seeded_store();
    let transfer = MemoryFileTransfer::new();
    let coordinator = UploadCoordinator::new(Arc::new(store.clone()), Arc::new(transfer.clone()));

    let err = coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(0))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::InvalidConcurrency));
    assert_eq!(transfer.object_count(), 0);
    assert!(store.update_log().is_empty());
}

#[tokio::test]
async fn empty_batch_reports_complete_without_writing() {
    let store = seeded_store();
    let coordinator =
        UploadCoordinator::new(Arc::new(store.clone()), Arc::new(MemoryFileTransfer::new()));
    let (seen, on_progress) = recorder();

    let records = coordinator
        .upload_all(Vec::new(), &target(), UploadOptions::new(3).with_progress(on_progress))
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![100]);
    assert!(store.update_log().is_empty());
}

#[tokio::test]
async fn missing_study_is_reported_after_transfer() {
    let store = MemoryDocumentStore::new();
    let coordinator = UploadCoordinator::new(Arc::new(store), Arc::new(MemoryFileTransfer::new()));

    let err = coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(3))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::StudyNotFound(id) if id == STUDY));
}

/// Counts transfers in flight on top of the in-memory backend.
struct CountingTransfer {
    inner: MemoryFileTransfer,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl FileTransfer for CountingTransfer {
    async fn upload(
        &self,
        source: &FileSource,
        storage_path: &str,
        progress: ProgressFn<'_>,
    ) -> Result<StoredObject, RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.inner.upload(source, storage_path, progress).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn download_url(&self, storage_path: &str) -> Result<String, RemoteError> {
        self.inner.download_url(storage_path).await
    }

    async fn delete(&self, storage_path: &str) -> Result<(), RemoteError> {
        self.inner.delete(storage_path).await
    }
}

#[tokio::test(start_paused = true)]
async fn never_exceeds_the_concurrency_cap() {
    let transfer = Arc::new(CountingTransfer {
        inner: MemoryFileTransfer::new()
            .with_chunk_bytes(KB)
            .with_tick_delay(Duration::from_millis(5)),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let coordinator = UploadCoordinator::new(Arc::new(seeded_store()), transfer.clone());
    let files: Vec<_> = (0..7)
        .map(|i| FileSource::memory(format!("photo-{i}.jpg"), vec![0u8; 3 * KB]))
        .collect();

    let records = coordinator
        .upload_all(files, &target(), UploadOptions::new(3))
        .await
        .unwrap();

    assert_eq!(records.len(), 7);
    assert_eq!(transfer.peak.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn remove_file_deletes_object_and_record() {
    let store = seeded_store();
    let transfer = MemoryFileTransfer::new();
    let coordinator = UploadCoordinator::new(Arc::new(store.clone()), Arc::new(transfer.clone()));
    let records = coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(3))
        .await
        .unwrap();

    let removed = coordinator.remove_file(STUDY, &records[1].id).await.unwrap();

    assert_eq!(removed, records[1]);
    assert!(!transfer.contains(&removed.storage_path));
    let files = store.document(STUDY).unwrap()["files"].clone();
    let names: Vec<_> = files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["floorplan.pdf", "survey.mp4", "garage.jpg"]);
}

#[tokio::test]
async fn remove_unknown_file_is_an_error() {
    let coordinator =
        UploadCoordinator::new(Arc::new(seeded_store()), Arc::new(MemoryFileTransfer::new()));

    let err = coordinator.remove_file(STUDY, "fil-missing").await.unwrap_err();

    assert!(matches!(err, UploadError::FileNotFound { .. }));
}

#[tokio::test]
async fn refresh_download_url_rewrites_a_stale_url() {
    let store = seeded_store();
    let coordinator =
        UploadCoordinator::new(Arc::new(store.clone()), Arc::new(MemoryFileTransfer::new()));
    let records = coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(3))
        .await
        .unwrap();

    // Another client left an expired URL behind.
    let mut files = store.document(STUDY).unwrap()["files"].clone();
    files[2]["downloadUrl"] = json!("mem://expired");
    let mut stale = Study::from_document(store.document(STUDY).unwrap()).unwrap();
    stale.payload.insert("files".into(), files);
    store.insert(stale.to_document().unwrap()).unwrap();

    let url = coordinator
        .refresh_download_url(STUDY, &records[1].id)
        .await
        .unwrap();

    assert_eq!(url, records[1].download_url);
    assert_eq!(store.document(STUDY).unwrap()["files"][2]["downloadUrl"], json!(url));
}

#[tokio::test]
async fn filesystem_backend_stores_real_files() {
    let dir = tempfile::tempdir().unwrap();
    let transfer = FsFileTransfer::new(dir.path()).with_chunk_bytes(KB);
    let coordinator = UploadCoordinator::new(Arc::new(seeded_store()), Arc::new(transfer));
    let (seen, on_progress) = recorder();

    let records = coordinator
        .upload_all(skewed_batch(), &target(), UploadOptions::new(2).with_progress(on_progress))
        .await
        .unwrap();

    for record in &records {
        let stored = std::fs::metadata(dir.path().join(&record.storage_path)).unwrap();
        assert_eq!(stored.len(), record.size_bytes);
    }
    assert_eq!(seen.lock().unwrap().last(), Some(&100));
}
