use serde::Serialize;
use sf_core::enums::{Route, WorkflowStep};
use sf_core::graph::{self, Navigation};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RouteArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
struct RouteResponse {
    target: WorkflowStep,
    current: WorkflowStep,
    status: WorkflowStep,
    outcome: &'static str,
    route: Route,
}

fn decide(args: &RouteArgs) -> RouteResponse {
    // Without an explicit high-water mark, the furthest step seen stands in.
    let status = args.status.unwrap_or_else(|| {
        args.visited
            .iter()
            .copied()
            .chain(std::iter::once(args.current))
            .max()
            .unwrap_or(args.current)
    });

    let (outcome, route) = match graph::resolve(args.target, args.current, &args.visited, status)
    {
        Navigation::Proceed(route) => ("proceed", route),
        Navigation::Redirect(route) => ("redirect", route),
    };

    RouteResponse {
        target: args.target,
        current: args.current,
        status,
        outcome,
        route,
    }
}

/// Handle `sfw route`.
pub fn handle(args: &RouteArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&decide(args), flags.format)
}
