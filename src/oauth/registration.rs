//! Dynamic client registration (RFC 7591)
//!
//! Fallback path used only when no `client_id` is configured. The
//! client POSTs its metadata to the registration endpoint; on a 201
//! response carrying a `client_id` the returned fields are merged over
//! the local client record, with the server-assigned values taking
//! precedence. Any other outcome leaves the record untouched -- the
//! caller re-checks `client_id` and surfaces a registration failure to
//! the user. Registration is never retried automatically.

use serde::Deserialize;

use crate::config::ClientConfig;

/// Fields the authorization server may return from registration.
///
/// Only `client_id` is required; everything else is merged when
/// present. Servers commonly reassign `redirect_uris` and always
/// assign the secret for `secret_basic` clients.
#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    redirect_uris: Option<Vec<String>>,
    #[serde(default)]
    scope: Option<String>,
}

/// Performs dynamic client registration when credentials are absent.
pub struct ClientRegistrar {
    http: reqwest::Client,
    registration_endpoint: Option<String>,
}

impl ClientRegistrar {
    /// Creates a registrar for the configured registration endpoint.
    ///
    /// `registration_endpoint` may be `None` when a static client_id is
    /// configured; `register_if_needed` is then a no-op.
    pub fn new(http: reqwest::Client, registration_endpoint: Option<String>) -> Self {
        Self {
            http,
            registration_endpoint,
        }
    }

    /// Registers the client when `client.client_id` is absent.
    ///
    /// Returns `Some(updated)` with the merged record on success, and
    /// `None` both when registration was unnecessary and when it
    /// failed. Failures are logged but deliberately not propagated;
    /// the caller distinguishes the cases by re-checking `client_id`.
    pub async fn register_if_needed(&self, client: &ClientConfig) -> Option<ClientConfig> {
        if client.client_id.is_some() {
            return None;
        }

        let endpoint = match self.registration_endpoint.as_deref() {
            Some(endpoint) => endpoint,
            None => {
                tracing::warn!("No registration endpoint configured and no client_id present");
                return None;
            }
        };

        let template = serde_json::json!({
            "client_name": client.client_name,
            "client_uri": format!("{}/", client.base_url),
            "redirect_uris": client.redirect_uris,
            "grant_types": ["authorization_code"],
            "response_types": ["code"],
            "token_endpoint_auth_method": "secret_basic",
            "scope": client.scope,
        });

        let response = match self.http.post(endpoint).json(&template).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Client registration request failed: {}", e);
                return None;
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            tracing::warn!("Registration endpoint returned {}, expected 201", status);
            return None;
        }

        let body: RegistrationResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Malformed registration response: {}", e);
                return None;
            }
        };

        tracing::info!("Registered client: {}", body.client_id);

        let mut updated = client.clone();
        updated.client_id = Some(body.client_id);
        if body.client_secret.is_some() {
            updated.client_secret = body.client_secret;
        }
        if let Some(redirect_uris) = body.redirect_uris {
            updated.redirect_uris = redirect_uris;
        }
        if let Some(scope) = body.scope {
            updated.scope = scope;
        }
        Some(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_is_noop_when_client_id_present() {
        let registrar = ClientRegistrar::new(
            reqwest::Client::new(),
            Some("http://localhost:9001/register".to_string()),
        );
        let client = ClientConfig {
            client_id: Some("already-registered".to_string()),
            ..ClientConfig::default()
        };
        // No network call is made; the future resolves immediately.
        assert!(registrar.register_if_needed(&client).await.is_none());
    }

    #[tokio::test]
    async fn test_register_without_endpoint_fails_silently() {
        let registrar = ClientRegistrar::new(reqwest::Client::new(), None);
        let client = ClientConfig::default();
        assert!(registrar.register_if_needed(&client).await.is_none());
    }

    #[test]
    fn test_registration_response_parses_minimal_body() {
        let body: RegistrationResponse =
            serde_json::from_str(r#"{"client_id":"abc"}"#).expect("minimal body parses");
        assert_eq!(body.client_id, "abc");
        assert!(body.client_secret.is_none());
        assert!(body.redirect_uris.is_none());
    }

    #[test]
    fn test_registration_response_requires_client_id() {
        let result =
            serde_json::from_str::<RegistrationResponse>(r#"{"client_secret":"xyz"}"#);
        assert!(result.is_err());
    }
}
