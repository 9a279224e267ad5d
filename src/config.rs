//! Configuration management for Relier
//!
//! This module handles loading, parsing, and validating configuration
//! from a YAML file with CLI overrides. The configuration is a read-only
//! provider of endpoints, keys, and client credentials; the only runtime
//! mutation is the in-place update of [`ClientConfig`] when dynamic
//! client registration succeeds.

use crate::error::{RelierError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Main configuration structure for Relier
///
/// Holds the authorization-server contract (endpoints, issuer,
/// verification key) and the client record (credentials, redirect URIs,
/// scope, listen port).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Authorization server endpoints and trust anchors
    pub auth_server: AuthServerConfig,

    /// OAuth client record
    #[serde(default)]
    pub client: ClientConfig,
}

/// Authorization server configuration
///
/// All fields are consumed read-only and are immutable for the process
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthServerConfig {
    /// Authorization endpoint URL (user-agent redirect target)
    pub authorization_endpoint: String,

    /// Token endpoint URL (code and refresh exchanges)
    pub token_endpoint: String,

    /// Dynamic client registration endpoint URL (RFC 7591)
    #[serde(default)]
    pub registration_endpoint: Option<String>,

    /// Expected `iss` claim value for ID tokens
    pub issuer: String,

    /// RSA public key in PEM form used to verify ID-token signatures
    #[serde(default)]
    pub verification_key: Option<String>,
}

/// OAuth client record
///
/// When `client_id` is absent the client attempts dynamic registration
/// at startup of each authorization attempt; on a 201 response the
/// registered fields are merged over the local ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client identifier; `None` until configured or registered
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret used for Basic authentication at the token endpoint
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Ordered redirect URIs; the first entry is used for the
    /// authorization request and must match at the token endpoint
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Space-delimited scope string requested at authorization time
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Client name declared during dynamic registration
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Base URL of this client, used to derive registration metadata
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Port the client's HTTP surface listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_scope() -> String {
    "openid profile email".to_string()
}

fn default_client_name() -> String {
    "Relier Reference Client".to_string()
}

fn default_base_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_port() -> u16 {
    9000
}

impl Default for ClientConfig {
    fn default() -> Self {
        let base_url = default_base_url();
        Self {
            client_id: None,
            client_secret: None,
            redirect_uris: vec![format!("{}/callback", base_url)],
            scope: default_scope(),
            client_name: default_client_name(),
            base_url,
            port: default_port(),
        }
    }
}

impl ClientConfig {
    /// Returns the redirect URI used for the authorization request.
    ///
    /// The same URI must be sent in the token exchange; authorization
    /// servers reject mismatches.
    pub fn primary_redirect_uri(&self) -> Option<&str> {
        self.redirect_uris.first().map(String::as_str)
    }
}

impl Config {
    /// Load configuration from a YAML file with CLI overrides applied.
    ///
    /// Missing files are an error here, unlike optional settings: the
    /// client cannot operate without authorization server endpoints.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_cli_overrides(cli);
        // A partially specified client block leaves redirect_uris empty;
        // derive the conventional callback URI from base_url, as the
        // registration template does.
        if config.client.redirect_uris.is_empty() {
            config
                .client
                .redirect_uris
                .push(format!("{}/callback", config.client.base_url));
        }
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(RelierError::Config(format!("Config file not found: {}", path)).into());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RelierError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RelierError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(port) = cli.port {
            self.client.port = port;
        }
    }

    /// Validate the configuration.
    ///
    /// Endpoint URLs must parse, at least one redirect URI must be
    /// present, and a registration endpoint is required when no
    /// client_id is configured (the dynamic-registration fallback has
    /// nowhere to go otherwise).
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.auth_server.authorization_endpoint).map_err(|e| {
            RelierError::Config(format!("Invalid authorization endpoint: {}", e))
        })?;

        Url::parse(&self.auth_server.token_endpoint)
            .map_err(|e| RelierError::Config(format!("Invalid token endpoint: {}", e)))?;

        if let Some(ref registration) = self.auth_server.registration_endpoint {
            Url::parse(registration)
                .map_err(|e| RelierError::Config(format!("Invalid registration endpoint: {}", e)))?;
        }

        if self.auth_server.issuer.is_empty() {
            return Err(RelierError::Config("Issuer cannot be empty".to_string()).into());
        }

        if self.client.redirect_uris.is_empty() {
            return Err(RelierError::Config(
                "At least one redirect URI is required".to_string(),
            )
            .into());
        }

        if self.client.client_id.is_none() && self.auth_server.registration_endpoint.is_none() {
            return Err(RelierError::Config(
                "Either a client_id or a registration endpoint must be configured".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> Config {
        Config {
            auth_server: AuthServerConfig {
                authorization_endpoint: "http://localhost:9001/authorize".to_string(),
                token_endpoint: "http://localhost:9001/token".to_string(),
                registration_endpoint: Some("http://localhost:9001/register".to_string()),
                issuer: "http://localhost:9001/".to_string(),
                verification_key: None,
            },
            client: ClientConfig::default(),
        }
    }

    #[test]
    fn test_minimal_config_validates() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_token_endpoint_rejected() {
        let mut config = minimal_config();
        config.auth_server.token_endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_issuer_rejected() {
        let mut config = minimal_config();
        config.auth_server.issuer = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_redirect_uris_rejected() {
        let mut config = minimal_config();
        config.client.redirect_uris.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_client_id_and_no_registration_endpoint_rejected() {
        let mut config = minimal_config();
        config.client.client_id = None;
        config.auth_server.registration_endpoint = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_static_client_id_without_registration_endpoint_is_fine() {
        let mut config = minimal_config();
        config.client.client_id = Some("oauth-client-1".to_string());
        config.auth_server.registration_endpoint = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_client_has_callback_redirect() {
        let client = ClientConfig::default();
        assert_eq!(
            client.primary_redirect_uri(),
            Some("http://localhost:9000/callback")
        );
    }

    #[test]
    fn test_yaml_parsing_with_defaults() {
        let yaml = r#"
auth_server:
  authorization_endpoint: "http://localhost:9001/authorize"
  token_endpoint: "http://localhost:9001/token"
  issuer: "http://localhost:9001/"
client:
  client_id: "oauth-client-1"
  client_secret: "oauth-client-secret-1"
"#;
        let config: Config = serde_yaml::from_str(yaml).expect("valid yaml");
        assert_eq!(config.client.client_id.as_deref(), Some("oauth-client-1"));
        assert_eq!(config.client.scope, "openid profile email");
        assert_eq!(config.client.port, 9000);
        assert!(config.auth_server.registration_endpoint.is_none());
    }
}
