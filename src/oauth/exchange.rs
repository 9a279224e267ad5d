//! Token endpoint exchanges
//!
//! Implements the two POSTs the client makes to the token endpoint:
//! the authorization-code exchange and the refresh-token exchange.
//! Bodies are `application/x-www-form-urlencoded`; the code exchange
//! authenticates with `client_secret_basic` (RFC 6749 section 2.3.1:
//! client_id and client_secret are form-urlencoded before the Basic
//! credential is base64-encoded). Neither exchange is retried by the
//! core; retry policy belongs to the caller.

use std::collections::HashMap;

use base64::Engine as _;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{RelierError, Result};

/// Raw JSON response from the token endpoint.
///
/// `access_token` is the only required member. A refresh response that
/// omits `refresh_token` means the prior refresh token stays valid;
/// that retention is handled by the session layer, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Opaque access token
    pub access_token: String,
    /// Replacement refresh token, when the server rotates it
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Space-delimited granted scope
    #[serde(default)]
    pub scope: Option<String>,
    /// Compact-serialized ID token, present for OpenID Connect requests
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Performs code-for-token and refresh-token exchanges.
pub struct TokenExchanger {
    http: reqwest::Client,
    token_endpoint: String,
}

impl TokenExchanger {
    /// Creates an exchanger for the configured token endpoint.
    pub fn new(http: reqwest::Client, token_endpoint: String) -> Self {
        Self {
            http,
            token_endpoint,
        }
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// The `redirect_uri` sent here must exactly match the one used in
    /// the authorization request; authorization servers reject
    /// mismatches. Non-2xx responses become [`RelierError::Exchange`]
    /// carrying the HTTP status.
    pub async fn exchange_code(&self, code: &str, client: &ClientConfig) -> Result<TokenResponse> {
        let client_id = require_client_id(client)?;
        let redirect_uri = client.primary_redirect_uri().ok_or_else(|| {
            RelierError::Config("Client has no redirect URI configured".to_string())
        })?;

        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", redirect_uri);

        tracing::debug!("Requesting access token for code {}", code);

        let response = self
            .http
            .post(&self.token_endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                basic_auth_header(client_id, client.client_secret.as_deref().unwrap_or("")),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelierError::Exchange {
                status: status.as_u16(),
            }
            .into());
        }

        let body: TokenResponse = response.json().await?;
        tracing::info!("Got access token from code exchange");
        Ok(body)
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Client credentials travel in the form body for this grant,
    /// matching the reference behavior. A rejected refresh is not fatal
    /// to the process: the caller discards the stale session and
    /// restarts the full authorization flow.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientConfig,
    ) -> Result<TokenResponse> {
        let client_id = require_client_id(client)?;
        let client_secret = client.client_secret.as_deref().unwrap_or("");

        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", client_id);
        params.insert("client_secret", client_secret);

        tracing::debug!("Refreshing access token");

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelierError::Refresh(format!(
                "token endpoint returned {}",
                status.as_u16()
            ))
            .into());
        }

        let body: TokenResponse = response.json().await?;
        tracing::info!("Got access token from refresh exchange");
        Ok(body)
    }
}

fn require_client_id(client: &ClientConfig) -> Result<&str> {
    client
        .client_id
        .as_deref()
        .ok_or_else(|| RelierError::Config("Client is not registered".to_string()).into())
}

/// Builds the `client_secret_basic` Authorization header value.
///
/// Both halves are form-urlencoded before concatenation, per
/// RFC 6749 section 2.3.1.
pub(crate) fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let credential = format!("{}:{}", urlencode(client_id), urlencode(client_secret));
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credential)
    )
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
