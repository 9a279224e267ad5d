//! HTTP surface for the client
//!
//! Four routes drive the authorization-code flow from a browser:
//!
//! - `GET /` renders the current session (tokens and verified identity)
//! - `GET /authorize` starts a flow: registers the client when needed,
//!   resets the session, issues a fresh state value, and redirects the
//!   user agent to the authorization endpoint
//! - `GET /callback` receives the front-channel response, validates
//!   state, exchanges the code, verifies any ID token, and commits the
//!   session
//! - `GET /refresh` exchanges the refresh token; a rejected refresh
//!   clears the session and restarts the flow at `/authorize`
//!
//! Every failure is recovered here and rendered as an error page; no
//! handler ever takes the process down.

use std::sync::{Arc, RwLock};

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::config::{AuthServerConfig, ClientConfig, Config};
use crate::error::{RelierError, Result};
use crate::oauth::{
    build_authorization_url, AuthorizationRequest, ClientRegistrar, IdTokenVerifier, StateManager,
    TokenExchanger,
};
use crate::session::SessionState;

/// Shared state behind every handler.
///
/// The client record and session sit behind `std::sync` locks; critical
/// sections are short and never held across an await. The registrar
/// works on a snapshot of the client record and the merged result is
/// swapped back in afterwards.
pub struct AppState {
    auth_server: AuthServerConfig,
    client: RwLock<ClientConfig>,
    state: StateManager,
    session: RwLock<SessionState>,
    registrar: ClientRegistrar,
    exchanger: TokenExchanger,
    verifier: Option<IdTokenVerifier>,
}

impl AppState {
    /// Builds the application state from validated configuration.
    ///
    /// One `reqwest::Client` is shared by registration and the token
    /// exchanges. The ID-token verifier exists only when a verification
    /// key is configured; without one, ID tokens are ignored.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;

        let verifier = match config.auth_server.verification_key.as_deref() {
            Some(pem) => Some(IdTokenVerifier::new(
                pem,
                config.auth_server.issuer.clone(),
            )?),
            None => None,
        };

        Ok(Self {
            registrar: ClientRegistrar::new(
                http.clone(),
                config.auth_server.registration_endpoint.clone(),
            ),
            exchanger: TokenExchanger::new(http, config.auth_server.token_endpoint.clone()),
            auth_server: config.auth_server,
            client: RwLock::new(config.client),
            state: StateManager::new(),
            session: RwLock::new(SessionState::new()),
            verifier,
        })
    }

    fn client_snapshot(&self) -> ClientConfig {
        self.client.read().expect("client lock poisoned").clone()
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/authorize", get(authorize))
        .route("/callback", get(callback))
        .route("/refresh", get(refresh))
        .with_state(state)
}

/// Runs the HTTP server until shutdown.
pub async fn run(config: Config) -> Result<()> {
    let port = config.client.port;
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Client listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let session = state
        .session
        .read()
        .expect("session lock poisoned")
        .clone();
    session_page(&session)
}

/// Starts a new authorization flow.
async fn authorize(State(state): State<Arc<AppState>>) -> Response {
    // Register first when no client_id is configured; the registrar
    // works on a snapshot so no lock is held across the POST.
    let mut client = state.client_snapshot();
    if client.client_id.is_none() {
        if let Some(updated) = state.registrar.register_if_needed(&client).await {
            *state.client.write().expect("client lock poisoned") = updated;
        }
        client = state.client_snapshot();
    }
    let Some(client_id) = client.client_id.as_deref() else {
        let message = RelierError::Registration(
            "no client_id configured and dynamic registration failed".to_string(),
        )
        .to_string();
        return error_page(&message).into_response();
    };
    let Some(redirect_uri) = client.primary_redirect_uri() else {
        return error_page("Client has no redirect URI configured").into_response();
    };

    // A new flow discards whatever the previous one left behind.
    state
        .session
        .write()
        .expect("session lock poisoned")
        .clear();

    let state_value = state.state.issue();
    let request = AuthorizationRequest {
        scope: &client.scope,
        client_id,
        redirect_uri,
        state: &state_value,
    };

    match build_authorization_url(&state.auth_server.authorization_endpoint, &request) {
        Ok(url) => {
            tracing::info!("Redirecting to authorization endpoint");
            Redirect::to(&url).into_response()
        }
        Err(e) => error_page(&e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Receives the front-channel authorization response.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    // An error response from the authorization endpoint ends the flow.
    if let Some(error) = params.error.as_deref() {
        tracing::warn!("Authorization endpoint returned error: {}", error);
        return error_page(error).into_response();
    }

    // State is checked before anything touches the token endpoint.
    let received_state = params.state.as_deref().unwrap_or("");
    if !state.state.validate(received_state) {
        tracing::warn!("Callback state did not match the issued value");
        return error_page(&RelierError::StateMismatch.to_string()).into_response();
    }

    let Some(code) = params.code.as_deref() else {
        return error_page("Authorization response carried no code").into_response();
    };

    let client = state.client_snapshot();
    let response = match state.exchanger.exchange_code(code, &client).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Code exchange failed: {}", e);
            return error_page(&e.to_string()).into_response();
        }
    };

    // ID-token verification cannot fail the token grant: an invalid ID
    // token leaves the access token usable but the identity unset, and
    // the failure is shown to the user.
    let mut id_token_error = None;
    let claims = match (response.id_token.as_deref(), state.verifier.as_ref()) {
        (Some(id_token), Some(verifier)) => {
            let client_id = client.client_id.as_deref().unwrap_or("");
            match verifier.verify(id_token, client_id) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    id_token_error = Some(e.to_string());
                    None
                }
            }
        }
        (Some(_), None) => {
            tracing::debug!("ID token present but no verification key configured; ignoring");
            None
        }
        (None, _) => None,
    };

    state
        .session
        .write()
        .expect("session lock poisoned")
        .apply_exchange(&response, claims);

    match id_token_error {
        Some(message) => error_page(&message).into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// Exchanges the refresh token for a new access token.
async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    let refresh_token = state
        .session
        .read()
        .expect("session lock poisoned")
        .refresh_token
        .clone();

    let Some(refresh_token) = refresh_token else {
        tracing::warn!("No refresh token in session, restarting authorization");
        return Redirect::to("/authorize").into_response();
    };

    let client = state.client_snapshot();
    match state.exchanger.refresh(&refresh_token, &client).await {
        Ok(response) => {
            state
                .session
                .write()
                .expect("session lock poisoned")
                .apply_refresh(&response);
            Redirect::to("/").into_response()
        }
        Err(e) => {
            // A stale session is worse than no session; drop it and
            // start the flow over.
            tracing::warn!("Refresh exchange failed, clearing session: {}", e);
            state
                .session
                .write()
                .expect("session lock poisoned")
                .clear();
            Redirect::to("/authorize").into_response()
        }
    }
}

fn session_page(session: &SessionState) -> Html<String> {
    let access = session.access_token.as_deref().unwrap_or("NONE");
    let refresh = session.refresh_token.as_deref().unwrap_or("NONE");
    let scope = session.scope.as_deref().unwrap_or("NONE");
    let identity = match session.id_token_claims.as_ref() {
        Some(claims) => format!(
            "{} (issued by {})",
            claims.sub.as_deref().unwrap_or("unknown subject"),
            claims.iss
        ),
        None => "not authenticated".to_string(),
    };

    Html(format!(
        "<html><head><title>OAuth Client</title></head><body>\
         <h1>OAuth Client</h1>\
         <p>Access token: <code>{}</code></p>\
         <p>Refresh token: <code>{}</code></p>\
         <p>Scope: <code>{}</code></p>\
         <p>Identity: {}</p>\
         <p><a href=\"/authorize\">Get a token</a> | \
         <a href=\"/refresh\">Refresh the token</a></p>\
         </body></html>",
        escape(access),
        escape(refresh),
        escape(scope),
        escape(&identity),
    ))
}

fn error_page(message: &str) -> Html<String> {
    Html(format!(
        "<html><head><title>Error</title></head><body>\
         <h1>Error</h1><p>{}</p>\
         <p><a href=\"/\">Home</a></p>\
         </body></html>",
        escape(message)
    ))
}

// Values echoed into pages include the callback's error parameter,
// which is attacker-supplied.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
