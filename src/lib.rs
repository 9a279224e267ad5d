//! Relier - OAuth 2.0 authorization-code reference client
//!
//! This library implements a confidential OAuth 2.0 client for the
//! authorization-code grant, with optional OpenID Connect ID-token
//! verification.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `oauth`: The flow building blocks -- state management, dynamic
//!   registration, authorization URL construction, token exchanges,
//!   and ID-token verification
//! - `session`: The process-wide single-user token session
//! - `server`: The browser-facing HTTP surface wiring the flow together
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use relier::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!     relier::server::run(config).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use config::{AuthServerConfig, ClientConfig, Config};
pub use error::{RelierError, Result};
pub use oauth::{IdTokenClaims, IdTokenVerifier, StateManager, TokenExchanger, TokenResponse};
pub use session::SessionState;
