//! Workflow steps, sync kinds, sync statuses, and routes for Studyflow.
//!
//! Steps and kinds serialize with `kebab-case` names via
//! `#[serde(rename_all = "kebab-case")]`, matching the document store's field
//! values. Every enum exposes `as_str()` and a `Display` impl that agree.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// WorkflowStep
// ---------------------------------------------------------------------------

/// One stage of the fixed study workflow.
///
/// ```text
/// upload → analyze → resource-review → room-review → takeoff → complete
/// ```
///
/// Declaration order is the canonical ordering; `Ord` follows it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStep {
    Upload,
    Analyze,
    ResourceReview,
    RoomReview,
    Takeoff,
    Complete,
}

impl WorkflowStep {
    /// All steps in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Upload,
        Self::Analyze,
        Self::ResourceReview,
        Self::RoomReview,
        Self::Takeoff,
        Self::Complete,
    ];

    /// The step every new study starts at.
    pub const FIRST: Self = Self::Upload;

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Analyze => "analyze",
            Self::ResourceReview => "resource-review",
            Self::RoomReview => "room-review",
            Self::Takeoff => "takeoff",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStep {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| CoreError::UnknownStep(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SyncKind
// ---------------------------------------------------------------------------

/// A named slice of the study document that is persisted and reconciled
/// independently of the others.
///
/// `Workflow` is reserved for step transitions; the other kinds are opaque
/// payloads edited through optimistic mutations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum SyncKind {
    Workflow,
    Assets,
    Rooms,
    Annotations,
    TakeoffState,
    Checklist,
    Files,
}

impl SyncKind {
    pub const ALL: [Self; 7] = [
        Self::Workflow,
        Self::Assets,
        Self::Rooms,
        Self::Annotations,
        Self::TakeoffState,
        Self::Checklist,
        Self::Files,
    ];

    /// Document fields owned by this kind.
    #[must_use]
    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Workflow => &["workflowStatus", "currentStep", "visitedSteps"],
            Self::Assets => &["assets"],
            Self::Rooms => &["rooms"],
            Self::Annotations => &["annotations"],
            Self::TakeoffState => &["takeoff"],
            Self::Checklist => &["checklist"],
            Self::Files => &["files"],
        }
    }

    /// Payload field name for single-field kinds. `None` for `Workflow`.
    #[must_use]
    pub const fn payload_field(self) -> Option<&'static str> {
        match self {
            Self::Workflow => None,
            Self::Assets => Some("assets"),
            Self::Rooms => Some("rooms"),
            Self::Annotations => Some("annotations"),
            Self::TakeoffState => Some("takeoff"),
            Self::Checklist => Some("checklist"),
            Self::Files => Some("files"),
        }
    }

    /// Quiet period before a local edit is written back, tuned to how bursty
    /// edits of this kind are.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn default_debounce_ms(self) -> u64 {
        match self {
            Self::Workflow => 0,
            Self::Annotations => 300,
            Self::Assets | Self::Rooms | Self::Checklist | Self::Files => 500,
            Self::TakeoffState => 800,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Assets => "assets",
            Self::Rooms => "rooms",
            Self::Annotations => "annotations",
            Self::TakeoffState => "takeoff-state",
            Self::Checklist => "checklist",
            Self::Files => "files",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown sync kind '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// SyncStatus
// ---------------------------------------------------------------------------

/// Persistence status of one kind of one study.
///
/// ```text
/// idle → saving → saved
///               → error → saving (retry or next mutation)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// Canonical screen destination for a step. Used as the redirect target when
/// navigation to a step is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Home,
    UploadDocuments,
    Processing,
    ReviewResources,
    ReviewRooms,
    EngineeringTakeoff,
    Complete,
}

impl Route {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::UploadDocuments => "upload-documents",
            Self::Processing => "processing",
            Self::ReviewResources => "review-resources",
            Self::ReviewRooms => "review-rooms",
            Self::EngineeringTakeoff => "engineering-takeoff",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
