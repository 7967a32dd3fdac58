use serde::Serialize;
use sf_core::enums::{Route, WorkflowStep};
use sf_core::graph;

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Debug, Serialize)]
struct StepRow {
    index: usize,
    step: WorkflowStep,
    route: Route,
    next: Option<WorkflowStep>,
}

fn rows() -> Vec<StepRow> {
    graph::order()
        .iter()
        .map(|&step| StepRow {
            index: graph::index_of(step),
            step,
            route: graph::default_route_for(Some(step)),
            next: graph::next(step),
        })
        .collect()
}

/// Handle `sfw steps`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&rows(), flags.format)
}
