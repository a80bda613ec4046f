//! Token fingerprints and random token generation.
//!
//! Stores key every token by its SHA-256 hex digest so raw bearer secrets
//! never reach the database.

use std::fmt;

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};

/// Length of generated refresh tokens.
pub const REFRESH_TOKEN_LEN: usize = 64;

/// One-way hash of a token, used as its storage key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// SHA-256 hash a token for storage.
    pub fn of(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Fingerprints are storage keys; keep them out of logs anyway.
impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}…)", &self.0[..8])
    }
}

/// Generate a random refresh token (64 alphanumeric chars).
pub fn generate_refresh_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Whether a presented refresh token has the shape we issue.
pub fn is_well_formed_refresh_token(token: &str) -> bool {
    token.len() == REFRESH_TOKEN_LEN && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic_and_not_the_token() {
        let token = "some-bearer-token";
        let a = Fingerprint::of(token);
        let b = Fingerprint::of(token);
        assert_eq!(a, b);
        assert_ne!(a.as_str(), token);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn distinct_tokens_have_distinct_fingerprints() {
        assert_ne!(Fingerprint::of("a"), Fingerprint::of("b"));
    }

    #[test]
    fn debug_output_is_truncated() {
        let fp = Fingerprint::of("secret");
        let shown = format!("{fp:?}");
        assert!(!shown.contains(fp.as_str()));
    }

    #[test]
    fn generated_refresh_tokens_are_well_formed_and_unique() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert!(is_well_formed_refresh_token(&a));
        assert!(is_well_formed_refresh_token(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_refresh_tokens_are_rejected() {
        assert!(!is_well_formed_refresh_token(""));
        assert!(!is_well_formed_refresh_token("short"));
        assert!(!is_well_formed_refresh_token(&"!".repeat(REFRESH_TOKEN_LEN)));
    }
}
