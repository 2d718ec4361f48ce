//! zflow CLI entry point.

use anyhow::Result;
use clap::Parser;

use zflow::cli::{commands, handle_error, Cli, Commands};
use zflow::domain::models::Config;
use zflow::infrastructure::config::ConfigLoader;
use zflow::infrastructure::logging::{LogConfig, LoggerImpl};

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = ConfigLoader::load()?;
    if let Some(user) = cli.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        config.user_id = user.to_string();
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let _logger = LoggerImpl::init(&LogConfig::try_from(&config.logging)?)?;

    tracing::debug!(user_id = %config.user_id, "configuration loaded");

    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, cli.json).await,
        Commands::Task(args) => commands::task::execute(args, &config, cli.json).await,
        Commands::Ai(args) => commands::ai::execute(args, &config, cli.json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}
