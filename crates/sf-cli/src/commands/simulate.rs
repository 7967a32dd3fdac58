//! `sfw simulate`: one study from upload through room review, against
//! in-process backends.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sf_config::StudyflowConfig;
use sf_core::entities::{FileRecord, Study};
use sf_core::enums::{Route, SyncKind, SyncStatus, WorkflowStep};
use sf_core::graph::Navigation;
use sf_core::ids::{PREFIX_STUDY, generate_id};
use sf_remote::{
    DocumentStore, FileSource, FileTransfer, FsFileTransfer, JobInput, MemoryDocumentStore,
    MemoryFileTransfer, SimulatedRoomClassifier,
};
use sf_sync::{SyncEvent, SyncStore, await_job};
use sf_tasks::PollOptions;
use sf_upload::{UploadCoordinator, UploadOptions, UploadTarget};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SimulateArgs;
use crate::output::output;
use crate::progress::Progress;

const PHOTO_EXT: &str = ".jpg";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationSummary {
    study_id: String,
    owner_id: String,
    current_step: WorkflowStep,
    workflow_status: WorkflowStep,
    visited_steps: Vec<WorkflowStep>,
    files: Vec<FileRow>,
    rooms: usize,
    job_id: String,
    /// Where a jump from analyze straight to takeoff was sent.
    takeoff_request: RouteRow,
    sync: BTreeMap<&'static str, SyncStatus>,
    events: EventCounts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileRow {
    name: String,
    size_bytes: u64,
    storage_path: String,
}

impl From<&FileRecord> for FileRow {
    fn from(record: &FileRecord) -> Self {
        Self {
            name: record.name.clone(),
            size_bytes: record.size_bytes,
            storage_path: record.storage_path.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RouteRow {
    outcome: &'static str,
    route: Route,
}

impl From<Navigation> for RouteRow {
    fn from(navigation: Navigation) -> Self {
        match navigation {
            Navigation::Proceed(route) => Self {
                outcome: "proceed",
                route,
            },
            Navigation::Redirect(route) => Self {
                outcome: "redirect",
                route,
            },
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct EventCounts {
    navigated: usize,
    saved: usize,
    save_errors: usize,
    remote_applied: usize,
    remote_ignored: usize,
    store_errors: usize,
}

impl EventCounts {
    fn record(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Navigated { .. } => self.navigated += 1,
            SyncEvent::StatusChanged {
                status: SyncStatus::Saved,
                ..
            } => self.saved += 1,
            SyncEvent::StatusChanged {
                status: SyncStatus::Error,
                ..
            } => self.save_errors += 1,
            SyncEvent::RemoteApplied { .. } => self.remote_applied += 1,
            SyncEvent::RemoteIgnored { .. } => self.remote_ignored += 1,
            SyncEvent::StoreError { .. } => self.store_errors += 1,
            _ => {}
        }
    }

    /// Count everything already delivered, skipping over any lag gap.
    fn drain(receiver: &mut broadcast::Receiver<SyncEvent>) -> Self {
        let mut counts = Self::default();
        loop {
            match receiver.try_recv() {
                Ok(event) => counts.record(&event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "simulate: event receiver lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return counts,
            }
        }
    }
}

/// The survey video first, then the photos. Sizes are skewed on purpose so
/// aggregate progress is visibly weighted by bytes.
fn batch(args: &SimulateArgs) -> Vec<FileSource> {
    let mut files = vec![FileSource::memory(
        "survey.mp4",
        vec![0u8; args.video_kb * 1024],
    )];
    files.extend((1..=args.photos).map(|i| {
        FileSource::memory(format!("room-{i}{PHOTO_EXT}"), vec![0u8; args.photo_kb * 1024])
    }));
    files
}

fn confirm_rooms(rooms: &mut Value) {
    if let Some(items) = rooms.as_array_mut() {
        for room in items.iter_mut().filter_map(Value::as_object_mut) {
            room.insert("confirmed".to_string(), Value::Bool(true));
        }
    }
}

/// Handle `sfw simulate`.
pub async fn handle(
    args: &SimulateArgs,
    root: &Path,
    config: &StudyflowConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let owner_id = args
        .owner
        .clone()
        .unwrap_or_else(|| config.general.default_owner.clone());
    let study_id = generate_id(PREFIX_STUDY);

    let documents = MemoryDocumentStore::new();
    documents.insert(Study::new(&study_id, &owner_id, Utc::now()).to_document()?)?;
    let remote: Arc<dyn DocumentStore> = Arc::new(documents);

    let transfer: Arc<dyn FileTransfer> = if args.fs {
        let storage = root.join(&config.general.storage_dir);
        tracing::info!(storage = %storage.display(), "simulate: storing uploads on disk");
        Arc::new(FsFileTransfer::new(storage).with_chunk_bytes(config.upload.chunk_bytes))
    } else {
        Arc::new(
            MemoryFileTransfer::new()
                .with_chunk_bytes(config.upload.chunk_bytes)
                .with_tick_delay(Duration::from_millis(args.tick_ms)),
        )
    };

    let sync = SyncStore::new(Arc::clone(&remote), config.sync.clone());
    let mut events = sync.events();
    sync.subscribe(&study_id).await?;

    // Upload
    let mut upload = UploadOptions::from(&config.upload);
    if let Some(concurrency) = args.concurrency {
        upload.concurrency = concurrency;
    }
    if let Some(snapshot) = sync.snapshot(&study_id) {
        upload = upload.with_snapshot(snapshot);
    }
    let bar = Progress::percent("uploading");
    let sink = bar.clone();
    let upload = upload.with_progress(move |percent| sink.set_position(u64::from(percent)));

    let coordinator = UploadCoordinator::new(Arc::clone(&remote), transfer);
    let target = UploadTarget::new(owner_id.as_str(), study_id.as_str());
    let records = match coordinator.upload_all(batch(args), &target, upload).await {
        Ok(records) => {
            bar.finish_ok("uploaded");
            records
        }
        Err(error) => {
            bar.finish_err("upload failed");
            return Err(error.into());
        }
    };

    // Analyze
    sync.advance(&study_id, WorkflowStep::Analyze).await?;
    let takeoff_request = RouteRow::from(sync.route_for(&study_id, WorkflowStep::Takeoff)?);

    let mut polling = PollOptions::from(&config.polling);
    if let Some(interval_ms) = args.poll_interval_ms {
        polling.interval = Duration::from_millis(interval_ms);
    }
    let jobs = Arc::new(SimulatedRoomClassifier::new(
        Arc::clone(&remote),
        Duration::from_millis(args.job_delay_ms),
    ));
    let input = JobInput {
        study_id: study_id.clone(),
        image_paths: records
            .iter()
            .filter(|r| r.name.ends_with(PHOTO_EXT))
            .map(|r| r.storage_path.clone())
            .collect(),
    };

    let spinner = Progress::spinner("classifying rooms");
    let outcome = match await_job(&sync, jobs, input, polling, |study: &Study| {
        study.has_populated("rooms")
    })
    .await
    {
        Ok(outcome) => {
            spinner.finish_ok("rooms classified");
            outcome
        }
        Err(error) => {
            spinner.finish_err("classification failed");
            sync.shutdown();
            return Err(error.into());
        }
    };

    // Review
    sync.advance(&study_id, WorkflowStep::ResourceReview).await?;
    sync.advance(&study_id, WorkflowStep::RoomReview).await?;
    sync.mutate(&study_id, SyncKind::Rooms, confirm_rooms)?;
    sync.flush(&study_id).await?;

    let study = sync
        .snapshot(&study_id)
        .ok_or_else(|| anyhow::anyhow!("study {study_id} is no longer loaded"))?;
    let summary = SimulationSummary {
        study_id: study.id.clone(),
        owner_id: study.owner_id.clone(),
        current_step: study.current_step,
        workflow_status: study.workflow_status,
        visited_steps: study.visited_steps.clone(),
        files: records.iter().map(FileRow::from).collect(),
        rooms: study
            .payload
            .get("rooms")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        job_id: outcome.job_id,
        takeoff_request,
        sync: SyncKind::ALL
            .iter()
            .map(|&kind| (kind.as_str(), sync.sync_status(&study_id, kind)))
            .collect(),
        events: EventCounts::drain(&mut events),
    };
    sync.shutdown();

    output(&summary, flags.format)
}
