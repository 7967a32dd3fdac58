//! In-process [`DocumentStore`] with fault injection.
//!
//! Behaves like a push-based backend: every accepted update is followed by a
//! push of the full document to its subscribers and of the owner's summary
//! list to owner subscribers. Tests and the demo CLI use the injection hooks
//! to exercise failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sf_core::entities::{Study, StudySummary};

use crate::document::{Document, DocumentStore, PushSender, Subscription};
use crate::error::RemoteError;

#[derive(Default)]
struct State {
    docs: BTreeMap<String, Document>,
    by_id: HashMap<String, Vec<PushSender<Document>>>,
    by_owner: HashMap<String, Vec<PushSender<Vec<StudySummary>>>>,
    fail_next_updates: u32,
    latency: Option<Duration>,
    updates: Vec<(String, Map<String, Value>)>,
}

impl State {
    fn summaries_for(&self, owner_id: &str) -> Vec<StudySummary> {
        self.docs
            .values()
            .filter(|doc| doc.get("ownerId").and_then(Value::as_str) == Some(owner_id))
            .filter_map(|doc| Study::from_document(doc.clone()).ok())
            .map(|study| StudySummary::from(&study))
            .collect()
    }

    /// Push the current document and its owner's summaries. Closed feeds are
    /// pruned as a side effect.
    fn notify(&mut self, id: &str) {
        let Some(doc) = self.docs.get(id).cloned() else {
            return;
        };

        if let Some(subs) = self.by_id.get_mut(id) {
            subs.retain(|tx| tx.send(Ok(doc.clone())).is_ok());
        }

        if let Some(owner) = doc.get("ownerId").and_then(Value::as_str) {
            let summaries = self.summaries_for(owner);
            if let Some(subs) = self.by_owner.get_mut(owner) {
                subs.retain(|tx| tx.send(Ok(summaries.clone())).is_ok());
            }
        }
    }
}

/// Shared in-memory document store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<State>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every update by `latency` before it is applied.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace a whole document, as another client would, and push
    /// it to subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] if the document has no string `id`.
    pub fn insert(&self, document: Document) -> Result<(), RemoteError> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Transport("document has no id".into()))?
            .to_string();

        let mut state = self.lock();
        state.docs.insert(id.clone(), document);
        state.notify(&id);
        Ok(())
    }

    /// The stored document, read synchronously.
    #[must_use]
    pub fn document(&self, id: &str) -> Option<Document> {
        self.lock().docs.get(id).cloned()
    }

    /// Make the next `count` updates fail with a transport error.
    pub fn fail_next_updates(&self, count: u32) {
        self.lock().fail_next_updates = count;
    }

    /// Deliver a transport error to every open subscription.
    pub fn break_subscriptions(&self, reason: &str) {
        let mut state = self.lock();
        for subs in state.by_id.values_mut() {
            subs.retain(|tx| tx.send(Err(RemoteError::Transport(reason.into()))).is_ok());
        }
        for subs in state.by_owner.values_mut() {
            subs.retain(|tx| tx.send(Err(RemoteError::Transport(reason.into()))).is_ok());
        }
    }

    /// Every accepted update, in order.
    #[must_use]
    pub fn update_log(&self) -> Vec<(String, Map<String, Value>)> {
        self.lock().updates.clone()
    }

    /// Number of open by-id subscriptions for `id`.
    #[must_use]
    pub fn subscriber_count(&self, id: &str) -> usize {
        self.lock()
            .by_id
            .get(id)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, id: &str) -> Result<Option<Document>, RemoteError> {
        Ok(self.document(id))
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), RemoteError> {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if state.fail_next_updates > 0 {
            state.fail_next_updates -= 1;
            tracing::debug!(id, "memory store: injected update failure");
            return Err(RemoteError::Transport("injected update failure".into()));
        }

        let Some(Value::Object(doc)) = state.docs.get_mut(id) else {
            return Err(RemoteError::NotFound(id.to_string()));
        };
        for (key, value) in &fields {
            doc.insert(key.clone(), value.clone());
        }

        tracing::debug!(
            id,
            fields = ?fields.keys().collect::<Vec<_>>(),
            "memory store: update applied"
        );
        state.updates.push((id.to_string(), fields));
        state.notify(id);
        Ok(())
    }

    async fn subscribe_by_id(&self, id: &str) -> Result<Subscription<Document>, RemoteError> {
        let (tx, sub) = Subscription::channel();
        let mut state = self.lock();
        let initial = state
            .docs
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()));
        // The receiver is alive, so this send cannot fail.
        let _ = tx.send(initial);
        state.by_id.entry(id.to_string()).or_default().push(tx);
        Ok(sub)
    }

    async fn subscribe_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Subscription<Vec<StudySummary>>, RemoteError> {
        let (tx, sub) = Subscription::channel();
        let mut state = self.lock();
        let _ = tx.send(Ok(state.summaries_for(owner_id)));
        state
            .by_owner
            .entry(owner_id.to_string())
            .or_default()
            .push(tx);
        Ok(sub)
    }
}
