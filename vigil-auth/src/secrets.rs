//! Secret generation and digest helpers shared by the token services

use sha2::{Digest, Sha256};

/// Generate `N` random bytes rendered as lowercase hex (2N characters)
pub(crate) fn generate_secret_hex<const N: usize>() -> String {
    let bytes: [u8; N] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 of the input, rendered as lowercase hex.
///
/// Refresh tokens, reset tokens and API keys are persisted only through this
/// digest; the plaintext never reaches the store.
pub(crate) fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
