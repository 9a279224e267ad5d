//! Authorization request URL construction
//!
//! Builds the user-agent redirect URL for the authorization-code grant.
//! Query parameters are merged additively onto the base endpoint URL so
//! that any parameters already present on the configured endpoint
//! survive; values are percent-encoded by the `url` crate.

use url::Url;

use crate::error::{RelierError, Result};

/// Parameters carried in the authorization redirect.
///
/// `response_type` is always `code`; the remaining values come from the
/// client record and the freshly issued state.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    /// Space-delimited scope string to request
    pub scope: &'a str,
    /// Registered client identifier
    pub client_id: &'a str,
    /// Redirect URI the callback will arrive on
    pub redirect_uri: &'a str,
    /// Freshly issued anti-CSRF state value
    pub state: &'a str,
}

/// Builds the fully qualified authorization URL.
///
/// Pre-existing query parameters on `base` are preserved; the standard
/// authorization-code parameters are appended after them.
pub fn build_authorization_url(base: &str, request: &AuthorizationRequest<'_>) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| RelierError::Config(format!("Invalid authorization endpoint URL: {}", e)))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("scope", request.scope);
        query.append_pair("client_id", request.client_id);
        query.append_pair("redirect_uri", request.redirect_uri);
        query.append_pair("state", request.state);
    }

    Ok(url.to_string())
}
