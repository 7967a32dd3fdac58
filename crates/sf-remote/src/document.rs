//! The push-based document store contract.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sf_core::entities::StudySummary;
use tokio::sync::mpsc;

use crate::error::RemoteError;

/// A full study document as stored remotely.
pub type Document = Value;

/// Sender half of a [`Subscription`], held by the store.
pub type PushSender<T> = mpsc::UnboundedSender<Result<T, RemoteError>>;

/// A live feed of pushes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<Result<T, RemoteError>>,
}

impl<T> Subscription<T> {
    /// A connected sender/subscription pair.
    #[must_use]
    pub fn channel() -> (PushSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next push. `None` once the store closed the feed.
    pub async fn next(&mut self) -> Option<Result<T, RemoteError>> {
        self.rx.recv().await
    }
}

/// Remote storage of study documents with push notifications.
///
/// Every push carries the complete current document, never a delta.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document once.
    async fn get(&self, id: &str) -> Result<Option<Document>, RemoteError>;

    /// Merge `fields` into an existing document. Fields not named are left
    /// untouched.
    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), RemoteError>;

    /// Subscribe to one document. The current document is delivered first.
    async fn subscribe_by_id(&self, id: &str) -> Result<Subscription<Document>, RemoteError>;

    /// Subscribe to the summaries of every study an owner has.
    async fn subscribe_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Subscription<Vec<StudySummary>>, RemoteError>;
}
