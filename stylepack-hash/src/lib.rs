//! Lowercase hex sha256 helpers.

use sha2::{Digest, Sha256};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// First `len` hex characters of the digest, used for collision suffixes.
pub fn short_hex(hex_digest: &str, len: usize) -> &str {
    &hex_digest[..len.min(hex_digest.len())]
}
