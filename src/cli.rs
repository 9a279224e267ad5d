//! Command-line interface definition for Relier
//!
//! This module defines the CLI structure using clap's derive API.
//! The client is a single long-running HTTP surface, so there are no
//! subcommands; only the config path and a port override.

use clap::Parser;

/// Relier - reference OAuth 2.0 / OpenID Connect client
///
/// Serves the authorization, callback, and session pages for the
/// OAuth 2.0 authorization-code flow against a configured
/// authorization server.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "relier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Override the listen port from the configuration
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["relier"]);
        assert_eq!(cli.config, "config/config.yaml");
        assert!(cli.port.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_port_override() {
        let cli = Cli::parse_from(["relier", "--port", "9007"]);
        assert_eq!(cli.port, Some(9007));
    }

    #[test]
    fn test_config_path_override() {
        let cli = Cli::parse_from(["relier", "--config", "/tmp/relier.yaml"]);
        assert_eq!(cli.config, "/tmp/relier.yaml");
    }
}
