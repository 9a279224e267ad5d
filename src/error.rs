//! Error types for Relier
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.
//!
//! No error kind is allowed to crash the process: every variant is
//! recovered at the HTTP-request boundary and rendered as an error page.

use thiserror::Error;

/// Main error type for Relier operations
///
/// Each variant corresponds to a distinct failure mode of the
/// authorization-code flow: client registration, anti-CSRF state
/// validation, the code-for-token exchange, ID-token verification,
/// and refresh-token exchange.
#[derive(Error, Debug)]
pub enum RelierError {
    /// Configuration-related errors (missing file, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dynamic client registration failed (non-201 or malformed body)
    #[error("Client registration failed: {0}")]
    Registration(String),

    /// The callback state parameter did not match the issued value
    #[error("State value did not match")]
    StateMismatch,

    /// The token endpoint returned a non-2xx status for a code exchange
    #[error("Unable to fetch access token, server response: {status}")]
    Exchange {
        /// HTTP status code returned by the token endpoint
        status: u16,
    },

    /// An ID-token verification stage failed
    ///
    /// The per-stage reason is logged; externally every stage collapses
    /// into this single variant.
    #[error("ID token invalid: {0}")]
    TokenValidation(String),

    /// The refresh-token exchange was rejected by the token endpoint
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors (connection refused, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Relier operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = RelierError::Config("missing token endpoint".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: missing token endpoint"
        );
    }

    #[test]
    fn test_registration_error_display() {
        let error = RelierError::Registration("endpoint returned 400".to_string());
        assert_eq!(
            error.to_string(),
            "Client registration failed: endpoint returned 400"
        );
    }

    #[test]
    fn test_state_mismatch_display() {
        let error = RelierError::StateMismatch;
        assert_eq!(error.to_string(), "State value did not match");
    }

    #[test]
    fn test_exchange_error_carries_status() {
        let error = RelierError::Exchange { status: 403 };
        assert_eq!(
            error.to_string(),
            "Unable to fetch access token, server response: 403"
        );
    }

    #[test]
    fn test_token_validation_error_display() {
        let error = RelierError::TokenValidation("signature rejected".to_string());
        assert_eq!(error.to_string(), "ID token invalid: signature rejected");
    }

    #[test]
    fn test_refresh_error_display() {
        let error = RelierError::Refresh("invalid_grant".to_string());
        assert_eq!(error.to_string(), "Token refresh failed: invalid_grant");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: RelierError = io_error.into();
        assert!(matches!(error, RelierError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let error: RelierError = json_error.into();
        assert!(matches!(error, RelierError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RelierError>();
    }
}
