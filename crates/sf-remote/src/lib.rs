//! # sf-remote
//!
//! The collaborators the workflow engine talks to: a push-based document
//! store, a file transfer service and an asynchronous job service.
//!
//! Each is a trait so the engine can be driven against a real backend or
//! against the implementations shipped here:
//!
//! - [`MemoryDocumentStore`]: in-process documents with fault injection
//! - [`MemoryFileTransfer`] / [`FsFileTransfer`]: chunked transfers
//! - [`SimulatedRoomClassifier`]: a job that writes `rooms` after a delay

pub mod document;
pub mod error;
pub mod jobs;
pub mod memory;
pub mod transfer;

pub use document::{Document, DocumentStore, Subscription};
pub use error::RemoteError;
pub use jobs::{JobInput, JobService, JobState, JobStatus, JobTicket, SimulatedRoomClassifier};
pub use memory::MemoryDocumentStore;
pub use transfer::{
    FileSource, FileTransfer, FsFileTransfer, MemoryFileTransfer, StoredObject, TransferProgress,
};
