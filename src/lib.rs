pub mod cli;
pub mod core;
pub mod providers;
pub mod server;
pub mod store;

use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Fetch,
    Serve,
    History { limit: u32 },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xrate starting...");

    let config = crate::core::config::AppConfig::load(config_path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Fetch => cli::fetch::run(&config).await,
        AppCommand::Serve => cli::serve::run(&config).await,
        AppCommand::History { limit } => cli::history::run(&config, limit).await,
    }
}
