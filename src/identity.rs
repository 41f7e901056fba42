//! Identity checks shared by the orchestrators.
//!
//! Identities are e-mail addresses supplied by the front-end. They are
//! checked for shape only and otherwise used exactly as received, because
//! the tenant fingerprint hashes the raw bytes.

use crate::error::ServiceError;

const MAX_IDENTITY_LEN: usize = 254;

pub fn validate_identity(identity: &str) -> Result<(), ServiceError> {
    let invalid = || ServiceError::BadRequest("user_email must be a valid email address".into());

    if identity.is_empty() || identity.len() > MAX_IDENTITY_LEN {
        return Err(invalid());
    }
    if identity.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }
    match identity.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(invalid()),
    }
}
