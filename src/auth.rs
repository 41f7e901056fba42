//! Shared-secret API key check: the `ApiKeyGuard` Axum extractor.
//!
//! Handlers opt in by adding `_guard: ApiKeyGuard` to their parameter list.
//! The provided `X-API-KEY` header is hashed with SHA-256 and compared to
//! the hash of the configured secret in constant time, so neither the
//! secret's content nor its length leaks through timing.
//!
//! When no secret is configured every guarded request is rejected.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ServiceError;
use crate::server::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// SHA-256 of the configured secret, if any.
#[derive(Clone, Default)]
pub struct ApiKey {
    hash: Option<[u8; 32]>,
}

impl ApiKey {
    pub fn from_secret(secret: Option<&str>) -> Self {
        let hash = secret.filter(|s| !s.is_empty()).map(|s| {
            let mut out = [0u8; 32];
            out.copy_from_slice(&Sha256::digest(s.as_bytes()));
            out
        });
        Self { hash }
    }

    /// Read the secret from the environment variable `var`.
    pub fn from_env(var: &str) -> Self {
        let key = Self::from_secret(std::env::var(var).ok().as_deref());
        if !key.is_configured() {
            tracing::warn!("{} is not set; all authenticated requests will be rejected", var);
        }
        key
    }

    pub fn is_configured(&self) -> bool {
        self.hash.is_some()
    }

    pub fn verify(&self, provided: Option<&str>) -> bool {
        let Some(expected) = &self.hash else {
            return false;
        };
        let provided_hash = Sha256::digest(provided.unwrap_or("").as_bytes());
        bool::from(provided_hash.as_slice().ct_eq(expected.as_slice()))
    }
}

/// Extractor that enforces the `X-API-KEY` header.
pub struct ApiKeyGuard;

impl<S> FromRequestParts<S> for ApiKeyGuard
where
    ApiKey: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let key = ApiKey::from_ref(state);
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());

        if key.verify(provided) {
            Ok(ApiKeyGuard)
        } else {
            tracing::warn!(path = %parts.uri.path(), "rejected request with invalid API key");
            Err(ServiceError::Forbidden("Invalid API Key".to_string()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_matches_secret_only() {
        let key = ApiKey::from_secret(Some("s3cret"));
        assert!(key.is_configured());
        assert!(key.verify(Some("s3cret")));
        assert!(!key.verify(Some("s3cret ")));
        assert!(!key.verify(Some("")));
        assert!(!key.verify(None));
    }

    #[test]
    fn test_unconfigured_fails_closed() {
        for key in [ApiKey::from_secret(None), ApiKey::from_secret(Some(""))] {
            assert!(!key.is_configured());
            assert!(!key.verify(Some("anything")));
            assert!(!key.verify(None));
        }
    }
}
