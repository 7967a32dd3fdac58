//! Entity structs for the Studyflow document model.
//!
//! Each entity maps to a document (or an array element inside one) in the
//! remote document store. All structs derive `Serialize`, `Deserialize`, and
//! `JsonSchema` for JSON roundtrip and schema validation.

mod file;
mod study;
mod summary;

pub use file::FileRecord;
pub use study::{Study, Transition};
pub use summary::StudySummary;
