use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError<E> {
    #[error("concurrency limit must be at least 1")]
    InvalidConcurrency,

    /// The first task to fail. Tasks that already finished are not undone.
    #[error("task {index} failed: {source}")]
    Task { index: usize, source: E },
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    /// A single poll failed; polling goes on.
    #[error("poll failed: {0}")]
    Poll(E),

    #[error("polling timed out after {0:?}")]
    TimedOut(Duration),
}
