//! Single-user session state
//!
//! The client holds exactly one session: one access token, at most one
//! refresh token, and the claims of the most recent verified ID token.
//! Updates are wholesale -- a successful exchange replaces the session
//! atomically under the caller's lock, so observers never see an access
//! token from one exchange paired with a refresh token from another.

use crate::oauth::{IdTokenClaims, TokenResponse};

/// Tokens and identity for the process-wide session.
///
/// All fields start empty and are reset when a new authorization flow
/// begins, so a failed flow cannot leave stale credentials visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Current access token
    pub access_token: Option<String>,
    /// Current refresh token, when the server issued one
    pub refresh_token: Option<String>,
    /// Scope granted by the server, when stated
    pub scope: Option<String>,
    /// Claims of the verified ID token from the last code exchange
    pub id_token_claims: Option<IdTokenClaims>,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all tokens and identity.
    ///
    /// Called when a new authorization flow starts and when a refresh
    /// is rejected.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Replaces the session with the result of a code exchange.
    ///
    /// `claims` is `Some` only when the response carried an ID token
    /// that passed verification; an invalid ID token leaves the tokens
    /// usable but the identity unset.
    pub fn apply_exchange(&mut self, response: &TokenResponse, claims: Option<IdTokenClaims>) {
        *self = Self {
            access_token: Some(response.access_token.clone()),
            refresh_token: response.refresh_token.clone(),
            scope: response.scope.clone(),
            id_token_claims: claims,
        };
    }

    /// Replaces the tokens with the result of a refresh exchange.
    ///
    /// A refresh response that omits `refresh_token` means the prior
    /// refresh token is still valid, so it is retained. The verified
    /// identity from the original exchange is kept as well.
    pub fn apply_refresh(&mut self, response: &TokenResponse) {
        self.access_token = Some(response.access_token.clone());
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token.clone();
        }
        if response.scope.is_some() {
            self.scope = response.scope.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(access: &str, refresh: Option<&str>) -> TokenResponse {
        serde_json::from_value(serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
        }))
        .expect("response fixture")
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = SessionState::new();
        assert!(session.access_token.is_none());
        assert!(session.refresh_token.is_none());
        assert!(session.id_token_claims.is_none());
    }

    #[test]
    fn test_exchange_replaces_whole_session() {
        let mut session = SessionState::new();
        session.apply_exchange(&response("AT1", Some("RT1")), None);
        session.apply_exchange(&response("AT2", None), None);
        // No refresh token in the second exchange: the old one must not
        // survive a wholesale replacement.
        assert_eq!(session.access_token.as_deref(), Some("AT2"));
        assert!(session.refresh_token.is_none());
    }

    #[test]
    fn test_refresh_retains_prior_refresh_token() {
        let mut session = SessionState::new();
        session.apply_exchange(&response("AT1", Some("RT1")), None);
        session.apply_refresh(&response("AT2", None));
        assert_eq!(session.access_token.as_deref(), Some("AT2"));
        assert_eq!(session.refresh_token.as_deref(), Some("RT1"));
    }

    #[test]
    fn test_refresh_rotates_refresh_token_when_issued() {
        let mut session = SessionState::new();
        session.apply_exchange(&response("AT1", Some("RT1")), None);
        session.apply_refresh(&response("AT2", Some("RT2")));
        assert_eq!(session.refresh_token.as_deref(), Some("RT2"));
    }

    #[test]
    fn test_refresh_keeps_verified_identity() {
        let claims: IdTokenClaims = serde_json::from_str(
            r#"{"iss":"i","aud":"a","iat":1,"exp":2,"sub":"alice"}"#,
        )
        .expect("claims fixture");
        let mut session = SessionState::new();
        session.apply_exchange(&response("AT1", Some("RT1")), Some(claims));
        session.apply_refresh(&response("AT2", None));
        assert_eq!(
            session
                .id_token_claims
                .as_ref()
                .and_then(|c| c.sub.as_deref()),
            Some("alice")
        );
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut session = SessionState::new();
        session.apply_exchange(&response("AT1", Some("RT1")), None);
        session.clear();
        assert_eq!(session, SessionState::default());
    }
}
