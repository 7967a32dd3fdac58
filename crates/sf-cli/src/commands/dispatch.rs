use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
///
/// Pure workflow queries run without touching configuration.
pub async fn dispatch(command: Commands, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Steps => commands::steps::handle(flags),
        Commands::Route(args) => commands::route::handle(&args, flags),
        Commands::Schema(args) => commands::schema::handle(&args, flags),
        Commands::Config(args) => {
            let (_, config) = bootstrap::load_config(flags)?;
            commands::config::handle(&args, &config, flags)
        }
        Commands::Simulate(args) => {
            let (root, config) = bootstrap::load_config(flags)?;
            commands::simulate::handle(&args, &root, &config, flags).await
        }
    }
}
