use clap::{Args, Subcommand, ValueEnum};
use sf_core::enums::WorkflowStep;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run a study end to end against in-process backends.
    Simulate(SimulateArgs),
    /// Decide where a navigation request lands.
    Route(RouteArgs),
    /// List the workflow steps in order.
    Steps,
    /// Print the JSON schema of a document type.
    Schema(SchemaArgs),
    /// Show the effective configuration.
    Config(ConfigArgs),
}

#[derive(Clone, Debug, Args)]
pub struct SimulateArgs {
    /// Number of site photos to upload alongside the survey video
    #[arg(long, default_value_t = 4)]
    pub photos: usize,

    /// Size of each photo in KiB
    #[arg(long, default_value_t = 256)]
    pub photo_kb: usize,

    /// Size of the survey video in KiB
    #[arg(long, default_value_t = 2048)]
    pub video_kb: usize,

    /// Store uploads under `general.storage_dir` instead of in memory
    #[arg(long)]
    pub fs: bool,

    /// Concurrent transfers (overrides `upload.concurrency`)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Delay between in-memory transfer chunks, in milliseconds
    #[arg(long, default_value_t = 20)]
    pub tick_ms: u64,

    /// How long the room classifier takes, in milliseconds
    #[arg(long, default_value_t = 1500)]
    pub job_delay_ms: u64,

    /// Job polling interval (overrides `polling.interval_ms`)
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Owner of the simulated study (defaults to `general.default_owner`)
    #[arg(long)]
    pub owner: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct RouteArgs {
    /// Requested step
    pub target: WorkflowStep,

    /// Step currently shown
    #[arg(long)]
    pub current: WorkflowStep,

    /// Furthest step reached (defaults to the furthest of current and visited)
    #[arg(long)]
    pub status: Option<WorkflowStep>,

    /// Steps already visited, comma separated
    #[arg(long, value_delimiter = ',')]
    pub visited: Vec<WorkflowStep>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchemaType {
    Study,
    File,
    Summary,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Document type
    #[arg(value_enum, default_value = "study")]
    pub type_name: SchemaType,
}

#[derive(Clone, Debug, Args)]
pub struct ConfigArgs {
    /// Print as TOML, ready to save as `.studyflow/config.toml`
    #[arg(long)]
    pub toml: bool,
}
