use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use sf_config::SyncConfig;
use sf_core::entities::{Study, StudySummary, Transition};
use sf_core::enums::{SyncKind, SyncStatus, WorkflowStep};
use sf_core::graph::{self, Navigation};
use sf_remote::{Document, DocumentStore, RemoteError, Subscription};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::SyncError;
use crate::event::SyncEvent;
use crate::guard::SyncGuard;

const EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Per-study bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct KindStatus {
    status: SyncStatus,
    error: Option<String>,
}

/// A scheduled write, tagged with the edit generation that scheduled it.
struct Debounce {
    generation: u64,
    handle: AbortHandle,
}

struct StudyEntry {
    study: Study,
    guards: HashMap<SyncKind, SyncGuard>,
    statuses: HashMap<SyncKind, KindStatus>,
    debounces: HashMap<SyncKind, Debounce>,
    cooldowns: HashMap<SyncKind, AbortHandle>,
    listener: Option<AbortHandle>,
}

impl StudyEntry {
    fn new(study: Study) -> Self {
        Self {
            study,
            guards: HashMap::new(),
            statuses: HashMap::new(),
            debounces: HashMap::new(),
            cooldowns: HashMap::new(),
            listener: None,
        }
    }

    fn guard(&mut self, kind: SyncKind) -> &mut SyncGuard {
        self.guards.entry(kind).or_default()
    }

    fn set_status(
        &mut self,
        study_id: &str,
        kind: SyncKind,
        status: SyncStatus,
        error: Option<String>,
    ) -> SyncEvent {
        let slot = self.statuses.entry(kind).or_default();
        slot.status = status;
        slot.error.clone_from(&error);
        SyncEvent::StatusChanged {
            study_id: study_id.to_string(),
            kind,
            status,
            error,
        }
    }

    fn abort_all(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        for (_, debounce) in self.debounces.drain() {
            debounce.handle.abort();
        }
        for (_, cooldown) in self.cooldowns.drain() {
            cooldown.abort();
        }
    }

    /// Merge a pushed study kind by kind, honoring guards.
    fn reconcile(
        &mut self,
        study_id: &str,
        incoming: &Study,
        now: Instant,
        cooldown: Duration,
    ) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        for kind in SyncKind::ALL {
            if !self.study.slice_differs(kind, incoming) {
                continue;
            }
            if self.guard(kind).suppresses(now, cooldown) {
                tracing::debug!(study_id, %kind, "sync: ignoring push inside guard window");
                events.push(SyncEvent::RemoteIgnored {
                    study_id: study_id.to_string(),
                    kind,
                });
            } else {
                tracing::debug!(study_id, %kind, "sync: applying pushed value");
                self.study.adopt_slice(kind, incoming);
                events.push(SyncEvent::RemoteApplied {
                    study_id: study_id.to_string(),
                    kind,
                });
            }
        }
        adopt_untracked_fields(&mut self.study, incoming);
        events
    }
}

fn is_tracked_field(key: &str) -> bool {
    SyncKind::ALL
        .iter()
        .any(|kind| kind.payload_field() == Some(key))
}

/// Fields no kind owns are never edited locally, so the remote copy wins.
fn adopt_untracked_fields(local: &mut Study, incoming: &Study) {
    local
        .payload
        .retain(|key, _| is_tracked_field(key) || incoming.payload.contains_key(key));
    for (key, value) in &incoming.payload {
        if !is_tracked_field(key) {
            local.payload.insert(key.clone(), value.clone());
        }
    }
}

struct OwnerEntry {
    summaries: Vec<StudySummary>,
    listener: AbortHandle,
}

#[derive(Default)]
struct State {
    studies: HashMap<String, StudyEntry>,
    owners: HashMap<String, OwnerEntry>,
    store_error: Option<String>,
}

impl State {
    fn ensure_unblocked(&self) -> Result<(), SyncError> {
        match &self.store_error {
            Some(message) => Err(SyncError::Blocked(message.clone())),
            None => Ok(()),
        }
    }

    fn entry_mut(&mut self, study_id: &str) -> Result<&mut StudyEntry, SyncError> {
        self.studies
            .get_mut(study_id)
            .ok_or_else(|| SyncError::NotLoaded(study_id.to_string()))
    }

    /// Clear the store-wide error after a good push.
    fn recover(&mut self, events: &mut Vec<SyncEvent>) {
        if self.store_error.take().is_some() {
            tracing::info!("sync: subscription recovered");
            events.push(SyncEvent::StoreRecovered);
        }
    }
}

// ---------------------------------------------------------------------------
// Shared core
// ---------------------------------------------------------------------------

struct Inner {
    remote: Arc<dyn DocumentStore>,
    config: SyncConfig,
    state: Mutex<State>,
    events: broadcast::Sender<SyncEvent>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_all(&self, events: Vec<SyncEvent>) {
        for event in events {
            // No receivers is fine.
            let _ = self.events.send(event);
        }
    }

    fn record_store_error(&self, message: &str) {
        tracing::warn!(error = message, "sync: subscription error, blocking edits");
        self.state().store_error = Some(message.to_string());
        self.emit_all(vec![SyncEvent::StoreError {
            message: message.to_string(),
        }]);
    }

    fn opening_failed(&self, error: RemoteError) -> SyncError {
        match error {
            RemoteError::NotFound(id) => SyncError::NotFound(id),
            other => {
                self.record_store_error(&other.to_string());
                SyncError::Remote(other)
            }
        }
    }

    /// Wait for the snapshot every feed starts with.
    async fn first_push<T: Send>(
        &self,
        feed: &mut Subscription<T>,
        what: &str,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.config.startup_timeout(), feed.next()).await {
            Err(_) => Err(SyncError::Timeout(format!("first snapshot of {what}"))),
            Ok(None) => Err(self.opening_failed(RemoteError::Closed)),
            Ok(Some(Err(e))) => Err(self.opening_failed(e)),
            Ok(Some(Ok(value))) => Ok(value),
        }
    }

    fn apply_push(&self, study_id: &str, document: Document) {
        let incoming = match Study::from_document(document) {
            Ok(study) => study,
            Err(e) => {
                tracing::warn!(study_id, error = %e, "sync: skipping undecodable push");
                return;
            }
        };

        let mut events = Vec::new();
        {
            let mut state = self.state();
            state.recover(&mut events);
            if let Some(entry) = state.studies.get_mut(study_id) {
                events.extend(entry.reconcile(
                    study_id,
                    &incoming,
                    Instant::now(),
                    self.config.cooldown(),
                ));
            }
        }
        self.emit_all(events);
    }

    fn apply_owner_push(&self, owner_id: &str, summaries: Vec<StudySummary>) {
        let mut events = Vec::new();
        {
            let mut state = self.state();
            state.recover(&mut events);
            if let Some(entry) = state.owners.get_mut(owner_id) {
                events.push(SyncEvent::OwnerUpdated {
                    owner_id: owner_id.to_string(),
                    studies: summaries.len(),
                });
                entry.summaries = summaries;
            }
        }
        self.emit_all(events);
    }

    /// Write the current value of `kind` now.
    ///
    /// `scheduled` is the generation of the debounce that fired, if any; its
    /// handle is forgotten unless a newer edit already replaced it.
    async fn persist_kind(
        self: &Arc<Self>,
        study_id: &str,
        kind: SyncKind,
        scheduled: Option<u64>,
    ) -> Result<(), SyncError> {
        let (patch, generation) = {
            let mut state = self.state();
            let entry = state.entry_mut(study_id)?;
            if let Some(fired) = scheduled {
                if entry
                    .debounces
                    .get(&kind)
                    .is_some_and(|d| d.generation == fired)
                {
                    entry.debounces.remove(&kind);
                }
            }
            let guard = entry.guard(kind);
            guard.touch(Instant::now());
            let generation = guard.generation();
            (entry.study.patch(kind), generation)
        };
        self.write(study_id, kind, patch, generation).await
    }

    async fn write(
        self: &Arc<Self>,
        study_id: &str,
        kind: SyncKind,
        patch: Map<String, Value>,
        generation: u64,
    ) -> Result<(), SyncError> {
        let saving = self
            .state()
            .studies
            .get_mut(study_id)
            .map(|entry| entry.set_status(study_id, kind, SyncStatus::Saving, None));
        self.emit_all(saving.into_iter().collect());

        match self.remote.update(study_id, patch).await {
            Ok(()) => {
                tracing::debug!(study_id, %kind, "sync: persisted");
                self.persisted(study_id, kind, generation);
                Ok(())
            }
            Err(source) => {
                tracing::warn!(study_id, %kind, error = %source, "sync: persist failed");
                let failed = self.state().studies.get_mut(study_id).map(|entry| {
                    entry.guard(kind).mark_failed();
                    entry.set_status(study_id, kind, SyncStatus::Error, Some(source.to_string()))
                });
                self.emit_all(failed.into_iter().collect());
                Err(SyncError::Persistence {
                    study_id: study_id.to_string(),
                    kind,
                    source,
                })
            }
        }
    }

    fn persisted(self: &Arc<Self>, study_id: &str, kind: SyncKind, generation: u64) {
        let cooldown = self.spawn_cooldown(study_id, kind, generation);
        let saved = {
            let mut state = self.state();
            let Some(entry) = state.studies.get_mut(study_id) else {
                cooldown.abort();
                return;
            };
            entry.guard(kind).mark_persisted(Instant::now(), generation);
            if let Some(previous) = entry.cooldowns.insert(kind, cooldown) {
                previous.abort();
            }
            entry.set_status(study_id, kind, SyncStatus::Saved, None)
        };
        self.emit_all(vec![saved]);
    }

    /// Lower the guard once the echo window after a write has passed.
    fn spawn_cooldown(self: &Arc<Self>, study_id: &str, kind: SyncKind, generation: u64) -> AbortHandle {
        let weak = Arc::downgrade(self);
        let study_id = study_id.to_string();
        let cooldown = self.config.cooldown();
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = inner.state();
            if let Some(entry) = state.studies.get_mut(&study_id) {
                entry.cooldowns.remove(&kind);
                if entry.guard(kind).clear_pending(generation) {
                    tracing::debug!(study_id, %kind, "sync: guard lowered");
                }
            }
        })
        .abort_handle()
    }

    fn spawn_debounce(
        self: &Arc<Self>,
        study_id: &str,
        kind: SyncKind,
        generation: u64,
    ) -> AbortHandle {
        let weak = Arc::downgrade(self);
        let study_id = study_id.to_string();
        let delay = self.config.debounce_for(kind);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Detached: aborting a debounce must never cut a write short.
            tokio::spawn(async move {
                // Failures are recorded in the kind's status.
                let _ = inner.persist_kind(&study_id, kind, Some(generation)).await;
            });
        })
        .abort_handle()
    }

    fn spawn_study_listener(
        self: &Arc<Self>,
        study_id: &str,
        mut feed: Subscription<Document>,
    ) -> AbortHandle {
        let weak = Arc::downgrade(self);
        let study_id = study_id.to_string();
        tokio::spawn(async move {
            while let Some(push) = feed.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match push {
                    Ok(document) => inner.apply_push(&study_id, document),
                    Err(e) => inner.record_store_error(&e.to_string()),
                }
            }
            tracing::debug!(study_id, "sync: study feed closed");
        })
        .abort_handle()
    }

    fn spawn_owner_listener(
        self: &Arc<Self>,
        owner_id: &str,
        mut feed: Subscription<Vec<StudySummary>>,
    ) -> AbortHandle {
        let weak = Arc::downgrade(self);
        let owner_id = owner_id.to_string();
        tokio::spawn(async move {
            while let Some(push) = feed.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match push {
                    Ok(summaries) => inner.apply_owner_push(&owner_id, summaries),
                    Err(e) => inner.record_store_error(&e.to_string()),
                }
            }
            tracing::debug!(owner_id, "sync: owner feed closed");
        })
        .abort_handle()
    }
}

// ---------------------------------------------------------------------------
// SyncStore
// ---------------------------------------------------------------------------

/// Local source of truth for loaded studies, kept in step with the remote
/// store.
///
/// Cheap to clone; clones share state. Background work (feeds, debounced
/// writes, guard timers) holds only weak references, so dropping the last
/// handle winds everything down. [`SyncStore::shutdown`] does so eagerly.
///
/// All methods that schedule work must run inside a tokio runtime.
#[derive(Clone)]
pub struct SyncStore {
    inner: Arc<Inner>,
}

impl SyncStore {
    pub fn new(remote: Arc<dyn DocumentStore>, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                remote,
                config,
                state: Mutex::new(State::default()),
                events,
            }),
        }
    }

    /// Status changes, reconciliation results and store errors.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    // -- subscriptions ------------------------------------------------------

    /// Load a study and keep it live.
    ///
    /// Resolves once the first snapshot arrives. Subscribing to a study that
    /// is already live returns its current local state.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Timeout`] if no snapshot arrives within the startup timeout
    /// - [`SyncError::NotFound`] if the document does not exist
    /// - [`SyncError::Remote`] for transport failures (which also block edits)
    /// - [`SyncError::Core`] if the snapshot is not a valid study
    pub async fn subscribe(&self, study_id: &str) -> Result<Study, SyncError> {
        if let Some(entry) = self.inner.state().studies.get(study_id) {
            if entry.listener.is_some() {
                return Ok(entry.study.clone());
            }
        }

        let mut feed = match self.inner.remote.subscribe_by_id(study_id).await {
            Ok(feed) => feed,
            Err(e) => return Err(self.inner.opening_failed(e)),
        };
        let document = self.inner.first_push(&mut feed, study_id).await?;
        let incoming = Study::from_document(document)?;
        let listener = self.inner.spawn_study_listener(study_id, feed);

        let mut events = Vec::new();
        let snapshot = {
            let mut state = self.inner.state();
            state.recover(&mut events);
            let entry = state
                .studies
                .entry(study_id.to_string())
                .or_insert_with(|| StudyEntry::new(incoming.clone()));
            if let Some(previous) = entry.listener.replace(listener) {
                previous.abort();
            }
            events.extend(entry.reconcile(
                study_id,
                &incoming,
                Instant::now(),
                self.inner.config.cooldown(),
            ));
            entry.study.clone()
        };
        self.inner.emit_all(events);

        tracing::info!(study_id, step = %snapshot.current_step, "sync: study loaded");
        Ok(snapshot)
    }

    /// Forget a study: close its feed and cancel its timers. Unsaved edits
    /// still waiting for their debounce are dropped; call [`Self::flush`]
    /// first to keep them.
    pub fn unsubscribe(&self, study_id: &str) -> bool {
        let removed = self.inner.state().studies.remove(study_id);
        removed.is_some_and(|mut entry| {
            entry.abort_all();
            tracing::info!(study_id, "sync: study unloaded");
            true
        })
    }

    /// Follow the summaries of every study an owner has.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subscribe`].
    pub async fn subscribe_owner(&self, owner_id: &str) -> Result<Vec<StudySummary>, SyncError> {
        let mut feed = match self.inner.remote.subscribe_by_owner(owner_id).await {
            Ok(feed) => feed,
            Err(e) => return Err(self.inner.opening_failed(e)),
        };
        let summaries = self.inner.first_push(&mut feed, owner_id).await?;
        let listener = self.inner.spawn_owner_listener(owner_id, feed);

        let previous = self.inner.state().owners.insert(
            owner_id.to_string(),
            OwnerEntry {
                summaries: summaries.clone(),
                listener,
            },
        );
        if let Some(previous) = previous {
            previous.listener.abort();
        }
        Ok(summaries)
    }

    pub fn unsubscribe_owner(&self, owner_id: &str) {
        if let Some(entry) = self.inner.state().owners.remove(owner_id) {
            entry.listener.abort();
        }
    }

    /// Latest summaries for an owner; empty if not followed.
    #[must_use]
    pub fn studies_for(&self, owner_id: &str) -> Vec<StudySummary> {
        self.inner
            .state()
            .owners
            .get(owner_id)
            .map(|entry| entry.summaries.clone())
            .unwrap_or_default()
    }

    /// Clear a subscription error and reopen the study's feed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subscribe`].
    pub async fn retry_subscription(&self, study_id: &str) -> Result<Study, SyncError> {
        {
            let mut state = self.inner.state();
            state.store_error = None;
            if let Some(listener) = state
                .studies
                .get_mut(study_id)
                .and_then(|entry| entry.listener.take())
            {
                listener.abort();
            }
        }
        self.subscribe(study_id).await
    }

    // -- edits --------------------------------------------------------------

    /// Move a study to `target` and persist its workflow fields.
    ///
    /// The local study changes before the write starts and is not rolled
    /// back if the write fails.
    ///
    /// # Errors
    ///
    /// - [`SyncError::IllegalTransition`] with the redirect route; nothing changes
    /// - [`SyncError::Persistence`] if the write failed
    /// - [`SyncError::Blocked`] / [`SyncError::NotLoaded`]
    pub async fn advance(
        &self,
        study_id: &str,
        target: WorkflowStep,
    ) -> Result<Transition, SyncError> {
        let (transition, patch, generation) = {
            let mut state = self.inner.state();
            state.ensure_unblocked()?;
            let entry = state.entry_mut(study_id)?;
            let transition = entry.study.navigate(target)?;
            let generation = entry.guard(SyncKind::Workflow).mark_pending(Instant::now());
            (transition, entry.study.patch(SyncKind::Workflow), generation)
        };

        tracing::info!(
            study_id,
            from = %transition.from,
            to = %transition.to,
            backward = transition.backward,
            "sync: workflow advanced"
        );
        self.inner.emit_all(vec![SyncEvent::Navigated {
            study_id: study_id.to_string(),
            from: transition.from,
            to: transition.to,
            backward: transition.backward,
        }]);

        self.inner
            .write(study_id, SyncKind::Workflow, patch, generation)
            .await?;
        Ok(transition)
    }

    /// Edit one kind of a study locally and schedule its write.
    ///
    /// `updater` runs synchronously against the current value (`Null` when
    /// the field is absent) and must not call back into the store. The write
    /// happens after the kind's debounce window; a newer edit of the same
    /// kind reschedules it, so only the latest value is written.
    ///
    /// # Errors
    ///
    /// - [`SyncError::ReservedKind`] for [`SyncKind::Workflow`]
    /// - [`SyncError::Blocked`] / [`SyncError::NotLoaded`]
    pub fn mutate<F>(&self, study_id: &str, kind: SyncKind, updater: F) -> Result<(), SyncError>
    where
        F: FnOnce(&mut Value),
    {
        if kind == SyncKind::Workflow {
            return Err(SyncError::ReservedKind(kind));
        }

        let mut state = self.inner.state();
        state.ensure_unblocked()?;
        let entry = state.entry_mut(study_id)?;
        if !entry.study.edit_slice(kind, updater) {
            return Err(SyncError::ReservedKind(kind));
        }

        let generation = entry.guard(kind).mark_pending(Instant::now());
        let handle = self.inner.spawn_debounce(study_id, kind, generation);
        if let Some(previous) = entry.debounces.insert(kind, Debounce { generation, handle }) {
            previous.handle.abort();
        }
        tracing::debug!(study_id, %kind, generation, "sync: local edit scheduled");
        Ok(())
    }

    /// Write every kind with a scheduled write now, e.g. before leaving a
    /// screen.
    ///
    /// # Errors
    ///
    /// Returns the first failure after attempting every kind.
    pub async fn flush(&self, study_id: &str) -> Result<(), SyncError> {
        let mut kinds: Vec<SyncKind> = {
            let mut state = self.inner.state();
            let entry = state.entry_mut(study_id)?;
            entry
                .debounces
                .drain()
                .map(|(kind, debounce)| {
                    debounce.handle.abort();
                    kind
                })
                .collect()
        };
        kinds.sort();

        let mut first_error = None;
        for kind in kinds {
            if let Err(e) = self.inner.persist_kind(study_id, kind, None).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Write one kind now, e.g. after a failed write.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Persistence`] if the write failed again
    /// - [`SyncError::Blocked`] / [`SyncError::NotLoaded`]
    pub async fn retry(&self, study_id: &str, kind: SyncKind) -> Result<(), SyncError> {
        {
            let mut state = self.inner.state();
            state.ensure_unblocked()?;
            let entry = state.entry_mut(study_id)?;
            if let Some(debounce) = entry.debounces.remove(&kind) {
                debounce.handle.abort();
            }
        }
        self.inner.persist_kind(study_id, kind, None).await
    }

    /// Abort every feed and timer and forget all studies. In-flight writes
    /// complete on their own.
    pub fn shutdown(&self) {
        let mut state = self.inner.state();
        for (_, mut entry) in state.studies.drain() {
            entry.abort_all();
        }
        for (_, owner) in state.owners.drain() {
            owner.listener.abort();
        }
        tracing::info!("sync: shut down");
    }

    // -- reads --------------------------------------------------------------

    /// Where navigation to `target` should land for this study.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotLoaded`] if the study is not subscribed.
    pub fn route_for(&self, study_id: &str, target: WorkflowStep) -> Result<Navigation, SyncError> {
        self.read(study_id, |entry| {
            graph::resolve(
                target,
                entry.study.current_step,
                &entry.study.visited_steps,
                entry.study.workflow_status,
            )
        })
        .ok_or_else(|| SyncError::NotLoaded(study_id.to_string()))
    }

    fn read<R>(&self, study_id: &str, f: impl FnOnce(&StudyEntry) -> R) -> Option<R> {
        self.inner.state().studies.get(study_id).map(f)
    }

    #[must_use]
    pub fn snapshot(&self, study_id: &str) -> Option<Study> {
        self.read(study_id, |entry| entry.study.clone())
    }

    #[must_use]
    pub fn current_step(&self, study_id: &str) -> Option<WorkflowStep> {
        self.read(study_id, |entry| entry.study.current_step)
    }

    #[must_use]
    pub fn workflow_status(&self, study_id: &str) -> Option<WorkflowStep> {
        self.read(study_id, |entry| entry.study.workflow_status)
    }

    #[must_use]
    pub fn visited_steps(&self, study_id: &str) -> Option<Vec<WorkflowStep>> {
        self.read(study_id, |entry| entry.study.visited_steps.clone())
    }

    #[must_use]
    pub fn sync_status(&self, study_id: &str, kind: SyncKind) -> SyncStatus {
        self.read(study_id, |entry| {
            entry
                .statuses
                .get(&kind)
                .map(|s| s.status)
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Message of the last failed write of `kind`, cleared by a success.
    #[must_use]
    pub fn sync_error(&self, study_id: &str, kind: SyncKind) -> Option<String> {
        self.read(study_id, |entry| {
            entry.statuses.get(&kind).and_then(|s| s.error.clone())
        })
        .flatten()
    }

    /// The subscription error currently blocking edits, if any.
    #[must_use]
    pub fn store_error(&self) -> Option<String> {
        self.inner.state().store_error.clone()
    }

    /// Whether `kind` has an edit whose guard window is still open.
    #[must_use]
    pub fn is_pending(&self, study_id: &str, kind: SyncKind) -> bool {
        self.read(study_id, |entry| {
            entry.guards.get(&kind).is_some_and(SyncGuard::is_pending)
        })
        .unwrap_or(false)
    }
}

impl std::fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("SyncStore")
            .field("studies", &state.studies.len())
            .field("owners", &state.owners.len())
            .field("store_error", &state.store_error)
            .finish_non_exhaustive()
    }
}
