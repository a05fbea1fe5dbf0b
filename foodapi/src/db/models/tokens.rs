//! Database models for session tokens.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{TokenId, UserId};

/// A freshly generated session token that has not been persisted yet.
///
/// This is the only place the plaintext exists. It is handed to the caller once at login and
/// never written anywhere; the row only stores `token_hash`.
#[derive(Clone)]
pub struct NewToken {
    pub user_id: UserId,
    pub plaintext: String,
    pub token_hash: Vec<u8>,
    pub expiry: DateTime<Utc>,
}

impl std::fmt::Debug for NewToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewToken")
            .field("user_id", &self.user_id)
            .field("plaintext", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Database entity model for a persisted token
#[derive(Debug, Clone, FromRow)]
pub struct TokenDBResponse {
    pub id: TokenId,
    pub user_id: UserId,
    /// Email of the user at issuance time, kept for audit
    pub email: String,
    pub token_hash: Vec<u8>,
    pub expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenDBResponse {
    /// Whether the token is still inside its lifetime at `now`. Expiry is exclusive.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }
}
