use sf_core::errors::CoreError;
use sf_remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload concurrency must be at least 1")]
    InvalidConcurrency,

    /// One file failed; the batch was abandoned. Objects already stored are
    /// left in place.
    #[error("Failed to upload {name}: {source}")]
    Transfer { name: String, source: RemoteError },

    #[error("Study not found: {0}")]
    StudyNotFound(String),

    #[error("File {file_id} not found in study {study_id}")]
    FileNotFound { study_id: String, file_id: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
