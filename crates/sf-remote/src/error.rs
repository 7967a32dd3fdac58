use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The backend rejected or failed the request.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Subscription closed")]
    Closed,

    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
