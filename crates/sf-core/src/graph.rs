//! Pure step-ordering and transition-validity logic.
//!
//! The canonical order of [`WorkflowStep`] is the single source of truth for
//! "forward" vs "backward" and for redirect targets. Nothing here performs
//! I/O or touches study state; callers pass the progress they hold.

use crate::enums::{Route, WorkflowStep};
use crate::errors::CoreError;

/// Outcome of resolving a navigation request against a study's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The target is reachable; show its route.
    Proceed(Route),
    /// The target is not reachable; send the user here instead.
    Redirect(Route),
}

impl Navigation {
    /// The route to display, whichever way navigation resolved.
    #[must_use]
    pub const fn route(self) -> Route {
        match self {
            Self::Proceed(route) | Self::Redirect(route) => route,
        }
    }
}

/// The fixed canonical ordering.
#[must_use]
pub const fn order() -> &'static [WorkflowStep] {
    &WorkflowStep::ALL
}

/// Position of `step` in the canonical ordering.
#[must_use]
pub const fn index_of(step: WorkflowStep) -> usize {
    step as usize
}

/// Position of a step given by name.
///
/// # Errors
///
/// Returns [`CoreError::UnknownStep`] if `name` is not a workflow step.
pub fn index_of_name(name: &str) -> Result<usize, CoreError> {
    name.parse::<WorkflowStep>().map(index_of)
}

/// The step after `step`, or `None` at the end of the workflow.
#[must_use]
pub fn next(step: WorkflowStep) -> Option<WorkflowStep> {
    order().get(index_of(step) + 1).copied()
}

/// The step before `step`, or `None` at the start of the workflow.
#[must_use]
pub fn previous(step: WorkflowStep) -> Option<WorkflowStep> {
    index_of(step)
        .checked_sub(1)
        .and_then(|i| order().get(i).copied())
}

/// Whether moving from `from` to `to` goes back in the workflow.
#[must_use]
pub const fn is_backward(from: WorkflowStep, to: WorkflowStep) -> bool {
    index_of(to) < index_of(from)
}

/// Whether `target` may be shown given the study's progress.
///
/// Reachable steps are the high-water mark itself, anything already visited,
/// and the single step after the high-water mark. Staying on the current
/// step is always allowed. Skipping more than one step ahead is not.
#[must_use]
pub fn can_navigate_to(
    target: WorkflowStep,
    current: WorkflowStep,
    visited: &[WorkflowStep],
    status: WorkflowStep,
) -> bool {
    target == current
        || target == status
        || visited.contains(&target)
        || next(status) == Some(target)
}

/// Canonical destination for a step. `None` maps to [`Route::Home`].
#[must_use]
pub const fn default_route_for(step: Option<WorkflowStep>) -> Route {
    match step {
        None => Route::Home,
        Some(WorkflowStep::Upload) => Route::UploadDocuments,
        Some(WorkflowStep::Analyze) => Route::Processing,
        Some(WorkflowStep::ResourceReview) => Route::ReviewResources,
        Some(WorkflowStep::RoomReview) => Route::ReviewRooms,
        Some(WorkflowStep::Takeoff) => Route::EngineeringTakeoff,
        Some(WorkflowStep::Complete) => Route::Complete,
    }
}

/// Resolve a navigation request to the route that should be displayed.
///
/// This is the one place redirects are decided: refused targets always land
/// on the route of the study's high-water mark.
#[must_use]
pub fn resolve(
    target: WorkflowStep,
    current: WorkflowStep,
    visited: &[WorkflowStep],
    status: WorkflowStep,
) -> Navigation {
    if can_navigate_to(target, current, visited, status) {
        Navigation::Proceed(default_route_for(Some(target)))
    } else {
        Navigation::Redirect(default_route_for(Some(status)))
    }
}
