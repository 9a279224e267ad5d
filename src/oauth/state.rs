//! Anti-CSRF state parameter management
//!
//! One unguessable state value is outstanding at a time, matching the
//! single-session reference design: each `/authorize` call issues a
//! fresh value, and the matching callback consumes it. A callback whose
//! state does not exactly equal the most recently issued value aborts
//! the flow before any token exchange.

use std::sync::Mutex;

use base64::Engine as _;

/// Issues and validates the anti-CSRF `state` parameter.
///
/// The expected value lives behind a `Mutex` so concurrent `/authorize`
/// and `/callback` requests cannot interleave issue/validate: the last
/// issued value wins, and validation is an atomic compare-and-take.
#[derive(Debug, Default)]
pub struct StateManager {
    expected: Mutex<Option<String>>,
}

impl StateManager {
    /// Creates a manager with no outstanding state value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh state value, stores it as the expected value,
    /// and returns it for inclusion in the authorization redirect.
    ///
    /// 16 cryptographically random bytes (128 bits) encoded as base64url
    /// without padding, so the value is URL-safe as a query parameter.
    pub fn issue(&self) -> String {
        use rand::RngCore as _;
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        let state = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        let mut expected = self.expected.lock().expect("state lock poisoned");
        *expected = Some(state.clone());
        state
    }

    /// Compares `received` against the currently expected value.
    ///
    /// On match the stored value is consumed, so a replayed callback
    /// with the same state no longer validates. On mismatch (including
    /// when no value is outstanding) the stored value is left untouched
    /// and the caller must abort the flow.
    pub fn validate(&self, received: &str) -> bool {
        let mut expected = self.expected.lock().expect("state lock poisoned");
        match expected.as_deref() {
            Some(current) if current == received => {
                *expected = None;
                true
            }
            _ => false,
        }
    }
}
