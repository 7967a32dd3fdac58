//! End-to-end behavior of `SyncStore` against the in-memory document store.
//!
//! All tests run on a paused clock, so debounce and guard windows are exact.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Map, Value, json};
use sf_config::SyncConfig;
use sf_core::entities::{Study, StudySummary};
use sf_core::enums::{Route, SyncKind, SyncStatus, WorkflowStep};
use sf_core::graph::Navigation;
use sf_remote::document::PushSender;
use sf_remote::{Document, DocumentStore, MemoryDocumentStore, RemoteError, Subscription};
use sf_sync::{SyncError, SyncEvent, SyncStore};

const STUDY: &str = "stu-0001";

fn seeded() -> (MemoryDocumentStore, SyncStore) {
    seeded_with(SyncConfig::default())
}

fn seeded_with(config: SyncConfig) -> (MemoryDocumentStore, SyncStore) {
    let remote = MemoryDocumentStore::new();
    let study = Study::new(STUDY, "usr-1", Utc::now());
    remote.insert(study.to_document().unwrap()).unwrap();
    let sync = SyncStore::new(Arc::new(remote.clone()), config);
    (remote, sync)
}

/// Let spawned tasks run without moving the clock meaningfully.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Replace the remote document with `f` applied, as another client would.
fn push_remote(remote: &MemoryDocumentStore, f: impl FnOnce(&mut Value)) {
    let mut doc = remote.document(STUDY).unwrap();
    f(&mut doc);
    remote.insert(doc).unwrap();
}

// ---------------------------------------------------------------------------
// Workflow transitions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn upload_then_analyze_then_back() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    let t = sync.advance(STUDY, WorkflowStep::Analyze).await.unwrap();
    assert!(!t.backward);
    assert_eq!(sync.workflow_status(STUDY), Some(WorkflowStep::Analyze));
    assert_eq!(sync.current_step(STUDY), Some(WorkflowStep::Analyze));
    assert_eq!(
        sync.visited_steps(STUDY).unwrap(),
        vec![WorkflowStep::Upload, WorkflowStep::Analyze]
    );

    let t = sync.advance(STUDY, WorkflowStep::Upload).await.unwrap();
    assert!(t.backward);
    assert_eq!(sync.current_step(STUDY), Some(WorkflowStep::Upload));
    assert_eq!(sync.workflow_status(STUDY), Some(WorkflowStep::Analyze));

    let doc = remote.document(STUDY).unwrap();
    assert_eq!(doc["workflowStatus"], json!("analyze"));
    assert_eq!(doc["currentStep"], json!("upload"));
    assert_eq!(doc["visitedSteps"], json!(["upload", "analyze"]));
    assert_eq!(sync.sync_status(STUDY, SyncKind::Workflow), SyncStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn skipping_ahead_is_refused_with_redirect() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    sync.advance(STUDY, WorkflowStep::Analyze).await.unwrap();
    let writes = remote.update_log().len();

    let err = sync.advance(STUDY, WorkflowStep::Takeoff).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::IllegalTransition {
            redirect: Route::Processing,
            ..
        }
    ));
    assert_eq!(sync.current_step(STUDY), Some(WorkflowStep::Analyze));
    assert_eq!(remote.update_log().len(), writes);
}

#[tokio::test(start_paused = true)]
async fn advance_never_lowers_workflow_status() {
    let (_remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    let path = [
        WorkflowStep::Analyze,
        WorkflowStep::ResourceReview,
        WorkflowStep::Upload,
        WorkflowStep::RoomReview,
        WorkflowStep::Analyze,
        WorkflowStep::Takeoff,
        WorkflowStep::ResourceReview,
    ];
    let mut high_water = WorkflowStep::Upload;
    for target in path {
        // Navigation attempts that are illegal leave progress unchanged.
        let _ = sync.advance(STUDY, target).await;
        let status = sync.workflow_status(STUDY).unwrap();
        assert!(status >= high_water, "{status} fell below {high_water}");
        high_water = status;
    }
}

#[tokio::test(start_paused = true)]
async fn failed_transition_write_keeps_local_move() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    remote.fail_next_updates(1);

    let err = sync.advance(STUDY, WorkflowStep::Analyze).await.unwrap_err();
    assert!(matches!(err, SyncError::Persistence { kind: SyncKind::Workflow, .. }));
    assert_eq!(sync.current_step(STUDY), Some(WorkflowStep::Analyze));
    assert_eq!(sync.sync_status(STUDY, SyncKind::Workflow), SyncStatus::Error);
    assert!(sync.sync_error(STUDY, SyncKind::Workflow).is_some());

    sync.retry(STUDY, SyncKind::Workflow).await.unwrap();
    assert_eq!(remote.document(STUDY).unwrap()["workflowStatus"], json!("analyze"));
    assert_eq!(sync.sync_status(STUDY, SyncKind::Workflow), SyncStatus::Saved);
    assert_eq!(sync.sync_error(STUDY, SyncKind::Workflow), None);
}

#[tokio::test(start_paused = true)]
async fn stale_workflow_echo_is_ignored() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    sync.advance(STUDY, WorkflowStep::Analyze).await.unwrap();

    push_remote(&remote, |doc| {
        doc["workflowStatus"] = json!("upload");
        doc["currentStep"] = json!("upload");
        doc["visitedSteps"] = json!(["upload"]);
    });
    settle().await;

    assert_eq!(sync.workflow_status(STUDY), Some(WorkflowStep::Analyze));
}

#[tokio::test(start_paused = true)]
async fn route_for_uses_loaded_progress() {
    let (_remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    assert_eq!(
        sync.route_for(STUDY, WorkflowStep::Analyze).unwrap(),
        Navigation::Proceed(Route::Processing)
    );
    assert_eq!(
        sync.route_for(STUDY, WorkflowStep::Complete).unwrap(),
        Navigation::Redirect(Route::UploadDocuments)
    );
    assert!(matches!(
        sync.route_for("stu-missing", WorkflowStep::Upload),
        Err(SyncError::NotLoaded(_))
    ));
}

// ---------------------------------------------------------------------------
// Optimistic mutations
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stale_push_after_local_edit_is_ignored() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    push_remote(&remote, |doc| doc["assets"] = json!(["original"]));
    settle().await;

    sync.mutate(STUDY, SyncKind::Assets, |v| *v = json!(["local"]))
        .unwrap();
    assert_eq!(sync.snapshot(STUDY).unwrap().slice(SyncKind::Assets), json!(["local"]));

    // Another writer's stale value arrives inside the guard window.
    push_remote(&remote, |doc| doc["assets"] = json!(["stale"]));
    settle().await;
    assert_eq!(sync.snapshot(STUDY).unwrap().slice(SyncKind::Assets), json!(["local"]));

    // After the debounce the local value is written, and only that field.
    sleep_ms(600).await;
    assert_eq!(remote.document(STUDY).unwrap()["assets"], json!(["local"]));
    let (_, fields) = remote.update_log().last().cloned().unwrap();
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["assets"]);
    assert_eq!(sync.sync_status(STUDY, SyncKind::Assets), SyncStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn push_after_guard_window_is_applied() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    sync.mutate(STUDY, SyncKind::Rooms, |v| *v = json!(["kitchen"]))
        .unwrap();
    // Debounce fires at 500 ms; the guard lowers a cooldown later.
    sleep_ms(1600).await;
    assert!(!sync.is_pending(STUDY, SyncKind::Rooms));

    push_remote(&remote, |doc| doc["rooms"] = json!(["kitchen", "bath"]));
    settle().await;
    assert_eq!(
        sync.snapshot(STUDY).unwrap().slice(SyncKind::Rooms),
        json!(["kitchen", "bath"])
    );
}

#[rstest]
#[case::assets(SyncKind::Assets, json!(["local"]))]
#[case::rooms(SyncKind::Rooms, json!([{"label": "kitchen"}]))]
#[case::checklist(SyncKind::Checklist, json!({"roof": true}))]
#[tokio::test(start_paused = true)]
async fn debounce_longer_than_cooldown_keeps_local_edit(
    #[case] kind: SyncKind,
    #[case] local: Value,
) {
    let field = kind.payload_field().unwrap();
    let mut config = SyncConfig::default();
    config.debounce_ms.insert(kind.as_str().to_string(), 2_000);
    let (remote, sync) = seeded_with(config);
    sync.subscribe(STUDY).await.unwrap();

    let edit = local.clone();
    sync.mutate(STUDY, kind, move |v| *v = edit).unwrap();

    // Past the cooldown but before the debounce has written anything.
    sleep_ms(1_200).await;
    push_remote(&remote, |doc| doc[field] = json!("stale"));
    settle().await;
    assert_eq!(sync.snapshot(STUDY).unwrap().slice(kind), local);

    sleep_ms(1_000).await;
    assert_eq!(remote.document(STUDY).unwrap()[field], local);
    assert_eq!(sync.sync_status(STUDY, kind), SyncStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn reconciliation_is_kind_scoped() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    sync.mutate(STUDY, SyncKind::Checklist, |v| *v = json!({"roof": true}))
        .unwrap();
    push_remote(&remote, |doc| {
        doc["checklist"] = json!({"roof": false});
        doc["annotations"] = json!([{"page": 1}]);
        doc["appraisal"] = json!({"value": 10});
    });
    settle().await;

    let study = sync.snapshot(STUDY).unwrap();
    assert_eq!(study.slice(SyncKind::Checklist), json!({"roof": true}));
    assert_eq!(study.slice(SyncKind::Annotations), json!([{"page": 1}]));
    assert_eq!(study.payload["appraisal"], json!({"value": 10}));
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_coalesce_into_one_write() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    let before = remote.update_log().len();

    for n in 1..=3 {
        sync.mutate(STUDY, SyncKind::TakeoffState, |v| *v = json!({"items": n}))
            .unwrap();
        sleep_ms(100).await;
    }
    // Last edit at 200 ms; takeoff debounce is 800 ms.
    sleep_ms(900).await;

    let log = remote.update_log();
    assert_eq!(log.len(), before + 1);
    assert_eq!(log.last().unwrap().1["takeoff"], json!({"items": 3}));
}

#[tokio::test(start_paused = true)]
async fn failed_write_keeps_value_and_blocks_pushes_until_retry() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    remote.fail_next_updates(1);

    sync.mutate(STUDY, SyncKind::Assets, |v| *v = json!(["mine"]))
        .unwrap();
    sleep_ms(600).await;
    assert_eq!(sync.sync_status(STUDY, SyncKind::Assets), SyncStatus::Error);
    assert!(sync.sync_error(STUDY, SyncKind::Assets).is_some());

    // Well past the cooldown, the unsynced edit still wins over pushes.
    sleep_ms(5_000).await;
    push_remote(&remote, |doc| doc["assets"] = json!(["theirs"]));
    settle().await;
    assert_eq!(sync.snapshot(STUDY).unwrap().slice(SyncKind::Assets), json!(["mine"]));

    sync.retry(STUDY, SyncKind::Assets).await.unwrap();
    assert_eq!(remote.document(STUDY).unwrap()["assets"], json!(["mine"]));
    assert_eq!(sync.sync_status(STUDY, SyncKind::Assets), SyncStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn flush_writes_pending_kinds_immediately() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    let before = remote.update_log().len();

    sync.mutate(STUDY, SyncKind::Assets, |v| *v = json!([1]))
        .unwrap();
    sync.mutate(STUDY, SyncKind::Annotations, |v| *v = json!([2]))
        .unwrap();
    sync.flush(STUDY).await.unwrap();

    let doc = remote.document(STUDY).unwrap();
    assert_eq!(doc["assets"], json!([1]));
    assert_eq!(doc["annotations"], json!([2]));

    // The cancelled debounces do not write again.
    sleep_ms(1_000).await;
    assert_eq!(remote.update_log().len(), before + 2);
}

#[tokio::test(start_paused = true)]
async fn untouched_absent_field_is_not_written_as_null() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    sync.mutate(STUDY, SyncKind::Rooms, |_| {}).unwrap();
    sync.flush(STUDY).await.unwrap();

    assert!(remote.document(STUDY).unwrap().get("rooms").is_none());
    assert!(!sync.snapshot(STUDY).unwrap().payload.contains_key("rooms"));
}

#[tokio::test(start_paused = true)]
async fn workflow_kind_cannot_be_mutated() {
    let (_remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    let err = sync
        .mutate(STUDY, SyncKind::Workflow, |_| {})
        .unwrap_err();
    assert!(matches!(err, SyncError::ReservedKind(SyncKind::Workflow)));
}

#[tokio::test(start_paused = true)]
async fn edits_require_a_loaded_study() {
    let (_remote, sync) = seeded();
    assert!(matches!(
        sync.mutate(STUDY, SyncKind::Assets, |_| {}),
        Err(SyncError::NotLoaded(_))
    ));
    assert!(matches!(
        sync.advance(STUDY, WorkflowStep::Analyze).await,
        Err(SyncError::NotLoaded(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn status_events_are_broadcast() {
    let (_remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    let mut events = sync.events();

    sync.mutate(STUDY, SyncKind::Files, |v| *v = json!([]))
        .unwrap();
    sleep_ms(600).await;

    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::StatusChanged { kind: SyncKind::Files, status, .. } = event {
            statuses.push(status);
        }
    }
    assert_eq!(statuses, vec![SyncStatus::Saving, SyncStatus::Saved]);
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn subscription_error_blocks_edits_until_recovery() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    remote.break_subscriptions("connection reset");
    settle().await;
    assert_eq!(sync.store_error().as_deref(), Some("Transport error: connection reset"));
    assert!(matches!(
        sync.advance(STUDY, WorkflowStep::Analyze).await,
        Err(SyncError::Blocked(_))
    ));
    assert!(matches!(
        sync.mutate(STUDY, SyncKind::Assets, |_| {}),
        Err(SyncError::Blocked(_))
    ));
    assert!(matches!(
        sync.retry(STUDY, SyncKind::Assets).await,
        Err(SyncError::Blocked(_))
    ));

    // A good push clears the error.
    push_remote(&remote, |_| {});
    settle().await;
    assert_eq!(sync.store_error(), None);
    sync.advance(STUDY, WorkflowStep::Analyze).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn retry_subscription_clears_the_error() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    remote.break_subscriptions("gone");
    settle().await;
    assert!(sync.store_error().is_some());

    let study = sync.retry_subscription(STUDY).await.unwrap();
    assert_eq!(study.id, STUDY);
    assert_eq!(sync.store_error(), None);
    sync.mutate(STUDY, SyncKind::Assets, |v| *v = json!(["ok"]))
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn subscribing_to_a_missing_study_fails() {
    let (_remote, sync) = seeded();
    assert!(matches!(
        sync.subscribe("stu-ghost").await,
        Err(SyncError::NotFound(_))
    ));
    // Missing documents are not a store-wide failure.
    assert_eq!(sync.store_error(), None);
}

#[tokio::test(start_paused = true)]
async fn undecodable_push_is_skipped() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();

    push_remote(&remote, |doc| doc["workflowStatus"] = json!("appraisal"));
    settle().await;

    assert_eq!(sync.workflow_status(STUDY), Some(WorkflowStep::Upload));
    assert_eq!(sync.store_error(), None);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_closes_the_feed() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    assert_eq!(remote.subscriber_count(STUDY), 1);

    assert!(sync.unsubscribe(STUDY));
    settle().await;
    assert_eq!(remote.subscriber_count(STUDY), 0);
    assert!(sync.snapshot(STUDY).is_none());
    assert!(!sync.unsubscribe(STUDY));
}

#[tokio::test(start_paused = true)]
async fn subscribe_twice_reuses_the_feed() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    sync.subscribe(STUDY).await.unwrap();
    assert_eq!(remote.subscriber_count(STUDY), 1);
}

#[tokio::test(start_paused = true)]
async fn owner_feed_lists_studies() {
    let (remote, sync) = seeded();
    let initial = sync.subscribe_owner("usr-1").await.unwrap();
    assert_eq!(initial.len(), 1);

    let other = Study::new("stu-0002", "usr-1", Utc::now());
    remote.insert(other.to_document().unwrap()).unwrap();
    settle().await;

    let ids: Vec<String> = sync.studies_for("usr-1").into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["stu-0001".to_string(), "stu-0002".to_string()]);
    assert!(sync.studies_for("usr-2").is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_scheduled_writes() {
    let (remote, sync) = seeded();
    sync.subscribe(STUDY).await.unwrap();
    let before = remote.update_log().len();

    sync.mutate(STUDY, SyncKind::Assets, |v| *v = json!([1]))
        .unwrap();
    sync.shutdown();
    sleep_ms(2_000).await;

    assert_eq!(remote.update_log().len(), before);
    assert!(sync.snapshot(STUDY).is_none());
}

/// A store that accepts subscriptions but never pushes anything.
#[derive(Default)]
struct SilentStore {
    feeds: Mutex<Vec<PushSender<Document>>>,
}

#[async_trait]
impl DocumentStore for SilentStore {
    async fn get(&self, _id: &str) -> Result<Option<Document>, RemoteError> {
        Ok(None)
    }

    async fn update(&self, id: &str, _fields: Map<String, Value>) -> Result<(), RemoteError> {
        Err(RemoteError::NotFound(id.to_string()))
    }

    async fn subscribe_by_id(&self, _id: &str) -> Result<Subscription<Document>, RemoteError> {
        let (tx, feed) = Subscription::channel();
        self.feeds.lock().unwrap().push(tx);
        Ok(feed)
    }

    async fn subscribe_by_owner(
        &self,
        _owner_id: &str,
    ) -> Result<Subscription<Vec<StudySummary>>, RemoteError> {
        let (_tx, feed) = Subscription::channel();
        Ok(feed)
    }
}

#[tokio::test(start_paused = true)]
async fn subscription_without_first_snapshot_times_out() {
    let config = SyncConfig {
        startup_timeout_ms: 2_000,
        ..SyncConfig::default()
    };
    let sync = SyncStore::new(Arc::new(SilentStore::default()), config);

    let started = tokio::time::Instant::now();
    let err = sync.subscribe(STUDY).await.unwrap_err();

    match err {
        SyncError::Timeout(what) => assert!(what.contains(STUDY), "timeout was {what}"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(sync.snapshot(STUDY).is_none());
}
