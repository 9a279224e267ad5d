//! ID-token verification -- the core validation state machine
//!
//! A compact JWT is accepted only when all six gates pass, in order:
//!
//! 1. Signature: the JOSE header must declare RS256 (anything else,
//!    including `none`, is rejected before any cryptography runs) and
//!    the signature must verify against the trusted key.
//! 2. Structural decode: three dot-separated segments, base64url
//!    payload, JSON claim set with the required members present.
//! 3. `iss` exactly equals the configured issuer.
//! 4. `aud` (string or array) contains the client's own client_id.
//! 5. `iat` is not in the future (zero clock-skew tolerance).
//! 6. `exp` has not passed.
//!
//! Each gate's failure is logged distinctly for diagnostics, but every
//! failure collapses into a single [`RelierError::TokenValidation`] so
//! no caller can observe a half-validated token. The claim set is
//! produced only on full success; there is no unverified-claims type.

use std::collections::HashSet;

use base64::Engine as _;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{RelierError, Result};

/// The `aud` claim: a single audience or a sequence of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "client123"`
    Single(String),
    /// `"aud": ["other", "client123"]`
    Many(Vec<String>),
}

impl Audience {
    /// Returns `true` when `client_id` equals the single audience or is
    /// one of the listed audiences.
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

/// Verified ID-token claim set.
///
/// Instances exist only as the output of [`IdTokenVerifier::verify`];
/// the standard timing/identity claims are typed and everything else is
/// carried through verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Token issuer
    pub iss: String,
    /// Intended audience(s)
    pub aud: Audience,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Authenticated subject identifier
    #[serde(default)]
    pub sub: Option<String>,
    /// Passthrough claims retained verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Verifies ID tokens against a trusted RS256 key and issuer.
///
/// The key is supplied once at startup and is immutable for the
/// process lifetime. The expected audience (the client_id) is passed
/// per call because dynamic registration can assign it after startup.
pub struct IdTokenVerifier {
    decoding_key: DecodingKey,
    issuer: String,
}

impl IdTokenVerifier {
    /// Creates a verifier from an RSA public key in PEM form.
    pub fn new(public_key_pem: &str, issuer: String) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| RelierError::Config(format!("Invalid verification key: {}", e)))?;
        Ok(Self {
            decoding_key,
            issuer,
        })
    }

    /// Runs all six verification gates against `token`.
    ///
    /// Returns the decoded claim set only when every gate passes;
    /// any failure is a [`RelierError::TokenValidation`].
    pub fn verify(&self, token: &str, client_id: &str) -> Result<IdTokenClaims> {
        let now = Utc::now().timestamp();

        // Gate 1: algorithm pin + signature.
        let header = decode_header(token).map_err(|e| {
            tracing::warn!("ID token rejected: malformed JOSE header: {}", e);
            invalid()
        })?;
        if header.alg != Algorithm::RS256 {
            tracing::warn!("ID token rejected: algorithm {:?} is not RS256", header.alg);
            return Err(invalid().into());
        }

        // Signature only; every claim check below is explicit so each
        // gate stays individually observable.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        decode::<serde_json::Value>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::warn!("ID token rejected: signature did not verify: {}", e);
            invalid()
        })?;
        tracing::debug!("ID token signature validated");

        // Gate 2: structural decode of the payload segment.
        let claims = decode_payload(token)?;

        // Gate 3: issuer.
        if claims.iss != self.issuer {
            tracing::warn!(
                "ID token rejected: issuer {} does not match expected {}",
                claims.iss,
                self.issuer
            );
            return Err(invalid().into());
        }

        // Gate 4: audience.
        if !claims.aud.contains(client_id) {
            tracing::warn!("ID token rejected: audience does not include {}", client_id);
            return Err(invalid().into());
        }

        // Gate 5: issued-at must not be in the future.
        if claims.iat > now {
            tracing::warn!(
                "ID token rejected: iat {} is in the future (now {})",
                claims.iat,
                now
            );
            return Err(invalid().into());
        }

        // Gate 6: expiry.
        if claims.exp < now {
            tracing::warn!("ID token rejected: expired at {} (now {})", claims.exp, now);
            return Err(invalid().into());
        }

        tracing::info!("ID token valid");
        Ok(claims)
    }
}

/// Splits the compact serialization and parses the payload claims.
fn decode_payload(token: &str) -> Result<IdTokenClaims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::warn!("ID token rejected: compact serialization is not three segments");
        return Err(invalid().into());
    };

    let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| {
            tracing::warn!("ID token rejected: payload is not base64url: {}", e);
            invalid()
        })?;

    serde_json::from_slice(&payload_bytes)
        .map_err(|e| {
            tracing::warn!("ID token rejected: payload claims malformed: {}", e);
            invalid().into()
        })
}

fn invalid() -> RelierError {
    RelierError::TokenValidation("verification failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The signature matrix lives in tests/verify_test.rs where signed
    // fixtures are produced with a real RSA key pair; these tests cover
    // the claim-shape logic that needs no cryptography.

    #[test]
    fn test_audience_single_match() {
        let aud = Audience::Single("client123".to_string());
        assert!(aud.contains("client123"));
        assert!(!aud.contains("other"));
    }

    #[test]
    fn test_audience_array_match() {
        let aud = Audience::Many(vec!["other".to_string(), "client123".to_string()]);
        assert!(aud.contains("client123"));
    }

    #[test]
    fn test_audience_array_without_client_rejected() {
        let aud = Audience::Many(vec!["other".to_string()]);
        assert!(!aud.contains("client123"));
    }

    #[test]
    fn test_claims_parse_with_string_audience() {
        let claims: IdTokenClaims = serde_json::from_str(
            r#"{"iss":"http://issuer/","aud":"client123","iat":100,"exp":200,"sub":"alice"}"#,
        )
        .expect("claims parse");
        assert_eq!(claims.iss, "http://issuer/");
        assert!(claims.aud.contains("client123"));
        assert_eq!(claims.sub.as_deref(), Some("alice"));
    }

    #[test]
    fn test_claims_parse_with_array_audience_and_passthrough() {
        let claims: IdTokenClaims = serde_json::from_str(
            r#"{"iss":"i","aud":["a","b"],"iat":1,"exp":2,"nonce":"n1","email":"a@example.com"}"#,
        )
        .expect("claims parse");
        assert!(claims.aud.contains("b"));
        assert_eq!(
            claims.extra.get("nonce").and_then(|v| v.as_str()),
            Some("n1")
        );
        assert_eq!(
            claims.extra.get("email").and_then(|v| v.as_str()),
            Some("a@example.com")
        );
    }

    #[test]
    fn test_claims_missing_exp_is_structural_failure() {
        let result = serde_json::from_str::<IdTokenClaims>(r#"{"iss":"i","aud":"a","iat":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_payload_rejects_two_segments() {
        assert!(decode_payload("onlyheader.payload").is_err());
    }

    #[test]
    fn test_decode_payload_rejects_non_base64_payload() {
        assert!(decode_payload("aGVhZGVy.!!!not-base64!!!.c2ln").is_err());
    }

    #[test]
    fn test_decode_payload_accepts_valid_segment() {
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"iss":"i","aud":"a","iat":1,"exp":2}"#);
        let token = format!("aGVhZGVy.{}.c2ln", payload);
        let claims = decode_payload(&token).expect("payload decodes");
        assert_eq!(claims.iss, "i");
    }
}
