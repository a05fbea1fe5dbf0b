//! Session token generation and hashing.
//!
//! A token's plaintext is 32 bytes from the OS-seeded CSPRNG, encoded as base64url without
//! padding. Only the SHA-256 digest of that string is ever persisted or compared.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use rand::prelude::RngExt;
use rand::rng;
use sha2::{Digest, Sha256};

use crate::db::models::tokens::NewToken;
use crate::errors::Error;
use crate::types::UserId;

/// Number of random bytes behind each token
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh random token plaintext
pub fn generate_plaintext() -> String {
    let mut token_bytes = [0u8; TOKEN_BYTES];
    rng().fill(&mut token_bytes);

    general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

/// The digest stored for, and looked up by, a token plaintext
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Generate a token for `user_id` expiring `ttl` from now. Nothing is persisted.
pub fn generate_token(user_id: UserId, ttl: Duration) -> Result<NewToken, Error> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::Internal {
        operation: format!("convert token ttl: {e}"),
    })?;
    let expiry = Utc::now().checked_add_signed(ttl).ok_or_else(|| Error::Internal {
        operation: "compute token expiry".to_string(),
    })?;

    let plaintext = generate_plaintext();
    let token_hash = hash_token(&plaintext);

    Ok(NewToken {
        user_id,
        plaintext,
        token_hash,
        expiry,
    })
}

/// Pull the token out of an `Authorization` header value.
///
/// Requires the exact `Bearer ` prefix followed by a non-empty token.
pub fn parse_bearer(header: &str) -> Option<&str> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_plaintext() {
        let token1 = generate_plaintext();
        let token2 = generate_plaintext();

        // Tokens should be different
        assert_ne!(token1, token2);

        // Tokens should be base64url encoded (43 chars for 32 bytes)
        assert_eq!(token1.len(), 43);

        // Should only contain base64url characters, without padding
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(!token1.contains('='));
    }

    #[test]
    fn test_hash_token_is_sha256_of_plaintext() {
        let digest = hash_token("abc");
        assert_eq!(digest.len(), 32);
        // Well-known SHA-256("abc") prefix
        assert_eq!(&digest[..4], &[0xba, 0x78, 0x16, 0xbf]);
        assert_eq!(hash_token("abc"), digest);
        assert_ne!(hash_token("abd"), digest);
    }

    #[test]
    fn test_generate_token() {
        let before = Utc::now();
        let token = generate_token(7, Duration::from_secs(24 * 60 * 60)).unwrap();

        assert_eq!(token.user_id, 7);
        assert_eq!(token.token_hash, hash_token(&token.plaintext));
        assert!(token.expiry >= before + chrono::Duration::hours(24));
        assert!(token.expiry <= Utc::now() + chrono::Duration::hours(24));
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("bearer abc"), None);
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("abc"), None);
        assert_eq!(parse_bearer(""), None);
    }
}
