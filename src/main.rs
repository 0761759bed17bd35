use anyhow::Result;
use clap::Parser;

use stars_grants::cli::commands::{
    check_rfw::CheckRfwCommand, demo::DemoCommand, show_config::ShowConfigCommand, show_usage,
    validate_proposal::ValidateProposalCommand, Command,
};
use stars_grants::cli::{Cli, Commands};
use stars_grants::config::GrantsConfig;
use stars_grants::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    GrantsConfig::load_env_file()?;
    let config = GrantsConfig::load_from(&cli.config)?;
    init_telemetry(&config.observability)?;

    match cli.command {
        // No subcommand: explain what is available
        None => tokio::runtime::Runtime::new()?.block_on(async { show_usage().await }),
        Some(Commands::ShowConfig) => {
            tokio::runtime::Runtime::new()?.block_on(async { ShowConfigCommand::new(config).execute().await })
        }
        Some(Commands::ValidateProposal { file, check_dates }) => {
            tokio::runtime::Runtime::new()?.block_on(async {
                ValidateProposalCommand::new(file)
                    .with_check_dates(check_dates)
                    .execute()
                    .await
            })
        }
        Some(Commands::CheckRfw { file }) => {
            tokio::runtime::Runtime::new()?.block_on(async { CheckRfwCommand::new(file).execute().await })
        }
        Some(Commands::Demo) => {
            tokio::runtime::Runtime::new()?.block_on(async { DemoCommand::new(config).execute().await })
        }
    }
}
