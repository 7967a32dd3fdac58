//! # sf-tasks
//!
//! Two async building blocks used across the workflow engine:
//!
//! - [`run_bounded`]: run a batch of fallible tasks with a concurrency cap,
//!   returning results in input order.
//! - [`PollingController`]: repeatedly poll until a condition holds, a
//!   deadline passes, or too many polls fail in a row.

pub mod concurrency;
pub mod error;
pub mod polling;

pub use concurrency::run_bounded;
pub use error::{PollError, RunError};
pub use polling::{MIN_INTERVAL, PollOptions, PollOutcome, PollState, PollingController};
