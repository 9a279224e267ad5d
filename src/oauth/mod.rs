//! OAuth 2.0 authorization-code flow building blocks
//!
//! Each submodule owns one step of the flow; the HTTP layer in
//! [`crate::server`] wires them together.

pub mod authorization;
pub mod exchange;
pub mod registration;
pub mod state;
pub mod verify;

pub use authorization::{build_authorization_url, AuthorizationRequest};
pub use exchange::{TokenExchanger, TokenResponse};
pub use registration::ClientRegistrar;
pub use state::StateManager;
pub use verify::{Audience, IdTokenClaims, IdTokenVerifier};
