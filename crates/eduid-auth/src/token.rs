//! Opaque password-reset tokens.
//!
//! The raw token only ever leaves the process inside a notification;
//! the identity provider stores its digest.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random reset token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_reset_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw reset token, hex-encoded.
///
/// This is the value stored under the `passwordResetToken` attribute.
pub fn hash_reset_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.trim().as_bytes());
    hex::encode(hasher.finalize())
}
