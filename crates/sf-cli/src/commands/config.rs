use sf_config::StudyflowConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ConfigArgs;
use crate::output::output;

/// Handle `sfw config`: print the merged, validated configuration.
pub fn handle(
    args: &ConfigArgs,
    config: &StudyflowConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    if args.toml {
        print!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }
    output(config, flags.format)
}
