//! # sf-upload
//!
//! Uploads a batch of files for a study with bounded concurrency, reports a
//! single aggregate percentage across the batch, and records the uploaded
//! files on the study document.

mod coordinator;
pub mod error;
mod progress;

pub use coordinator::{ProgressCallback, UploadCoordinator, UploadOptions, UploadTarget};
pub use error::UploadError;
pub use progress::AggregateProgress;
