use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

const LONG_ABOUT: &str = "\
Drive building studies through the Studyflow workflow:
upload -> analyze -> resource-review -> room-review -> takeoff -> complete.

`simulate` runs one study end to end against in-process backends: a batched
upload, room classification, and review edits synced back to the store.
The other commands inspect step routing, document schemas and the effective
configuration.";

const AFTER_HELP: &str = "\
Examples:
  sfw simulate --photos 8 --concurrency 2 --format table
  sfw route takeoff --current analyze --visited upload,analyze
  sfw schema file
  sfw config --toml > .studyflow/config.toml

Logging is controlled by STUDYFLOW_LOG (e.g. STUDYFLOW_LOG=sf_sync=debug).";

/// Top-level CLI parser for the `sfw` binary.
#[derive(Debug, Parser)]
#[command(
    name = "sfw",
    version,
    about = "Studyflow - upload, analyze and review building studies",
    long_about = LONG_ABOUT,
    after_help = AFTER_HELP
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format for summaries, routes and tables: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Errors only; hides upload and classification progress
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging for the sync and polling loops
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root holding `.studyflow/config.toml` and `.env` (defaults to
    /// the current directory)
    #[arg(short, long, global = true)]
    pub project: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            project: self.project.clone(),
        }
    }
}
