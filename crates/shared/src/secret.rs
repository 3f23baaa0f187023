//! Shared-secret hashing and comparison for trigger endpoints.

use sha2::{Digest, Sha256};

/// Computes SHA-256 of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares a presented secret against the configured one.
///
/// Both sides are hashed first so the comparison runs over fixed-length
/// values regardless of input length.
pub fn secrets_match(presented: &str, configured: &str) -> bool {
    if configured.is_empty() {
        return false;
    }

    let a = sha256_hex(presented);
    let b = sha256_hex(configured);

    // Fixed-length hex strings; compare every byte.
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex("same_input"), sha256_hex("same_input"));
        assert_ne!(sha256_hex("input1"), sha256_hex("input2"));
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("cron-secret", "cron-secret"));
        assert!(!secrets_match("wrong", "cron-secret"));
    }

    #[test]
    fn test_empty_configured_secret_never_matches() {
        assert!(!secrets_match("", ""));
        assert!(!secrets_match("anything", ""));
    }
}
