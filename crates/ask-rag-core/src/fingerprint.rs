//! Tenant fingerprints.
//!
//! A tenant's vector collection is named by the MD5 digest of the identity's
//! UTF-8 bytes, encoded as URL-safe base64 without padding. The encoding is
//! compatibility-critical: existing collections were created under exactly
//! this scheme, so identities are hashed as received (no trimming or case
//! folding).
//!
//! ```rust
//! use ask_rag_core::fingerprint::fingerprint;
//!
//! assert_eq!(fingerprint("user@example.com"), "tYmWxQTFY4eY62tRHm9Jrw");
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use md5::{Digest, Md5};

/// Length of every fingerprint (16 digest bytes → 22 base64 chars).
pub const FINGERPRINT_LEN: usize = 22;

/// Deterministic, fixed-length, URL-safe fingerprint of an identity.
pub fn fingerprint(identity: &str) -> String {
    let digest = Md5::digest(identity.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
