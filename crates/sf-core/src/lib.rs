//! # sf-core
//!
//! Core types, step graph, ID helpers, and error types for Studyflow.
//!
//! This crate provides the foundational types shared across all Studyflow crates:
//! - Entity structs for the study document and its projections
//! - The workflow step enumeration and the pure step graph over it
//! - Sync kinds (independently persisted document slices) and their statuses
//! - ID generation and storage path helpers
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod graph;
pub mod ids;
