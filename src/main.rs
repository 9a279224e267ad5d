//! Relier - OAuth 2.0 authorization-code reference client
//!
//! Main entry point: loads and validates configuration, then serves the
//! browser-facing flow until shutdown.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relier::cli::Cli;
use relier::config::Config;
use relier::server;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load and validate configuration
    let config = Config::load(&cli.config, &cli)?;
    config.validate()?;

    tracing::info!(
        "Starting client against issuer {}",
        config.auth_server.issuer
    );

    server::run(config).await
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "relier=debug" } else { "relier=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
