/// Password reset token utilities
///
/// Reset tokens are 16 random bytes from the OS RNG, hex encoded (32 chars).
/// Only the SHA-256 hash of a token is persisted, so a leaked reset table does
/// not hand out working reset links.
///
/// # Example
///
/// ```
/// use kakari_shared::auth::reset_token::{generate_reset_token, hash_reset_token};
///
/// let (token, hash) = generate_reset_token();
/// assert_eq!(token.len(), 32);
/// assert_eq!(hash_reset_token(&token), hash);
/// ```

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes in a reset token
const TOKEN_BYTES: usize = 16;

/// Length of a reset token in hex characters
pub const RESET_TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Generates a new reset token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hash)
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let token = hex::encode(bytes);
    let hash = hash_reset_token(&token);

    (token, hash)
}

/// Hashes a reset token using SHA-256 (hex-encoded, 64 characters)
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks that a token has the shape produced by `generate_reset_token`
///
/// Lets callers reject obviously malformed tokens before touching the store.
pub fn validate_reset_token_format(token: &str) -> bool {
    token.len() == RESET_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_token_format() {
        let (token, hash) = generate_reset_token();

        assert_eq!(token.len(), RESET_TOKEN_LENGTH);
        assert!(validate_reset_token_format(&token));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let (token1, _) = generate_reset_token();
        let (token2, _) = generate_reset_token();

        assert_ne!(token1, token2);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_reset_token("abc"), hash_reset_token("abc"));
        assert_ne!(hash_reset_token("abc"), hash_reset_token("abd"));
    }

    #[test]
    fn test_validate_reset_token_format_rejects_garbage() {
        assert!(!validate_reset_token_format("short"));
        assert!(!validate_reset_token_format(&"z".repeat(RESET_TOKEN_LENGTH)));
        assert!(validate_reset_token_format(&"a".repeat(RESET_TOKEN_LENGTH)));
    }
}
