// Waypoint map assistant
// Main entry point for the waypoint binary

use anyhow::Context;
use clap::Parser;
use waypoint_engine::cli::{Cli, Command};
use waypoint_engine::config::Config;
use waypoint_engine::handlers::{handle_ask, handle_config, handle_serve};
use waypoint_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)
    } else {
        Config::load_or_create()
    }
    .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // RUST_LOG still wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Waypoint v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { host, port } => handle_serve(&config, host, port).await,

        Command::Ask { message } => {
            tracing::info!("Asking: {}", message);
            handle_ask(message, &config).await
        }

        Command::Config { action } => handle_config(action, &config, &config_path),
    }
}
