//! Database repository for bearer session tokens.
//!
//! Tokens are looked up by the SHA-256 of their plaintext. Expiry is lazy: an expired row stays
//! in the table until the owner logs in again or the cleanup task sweeps it, but it never
//! validates.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::auth::tokens::hash_token;
use crate::db::{
    DEFAULT_QUERY_TIMEOUT, bounded,
    errors::{DbError, Result},
    models::{
        tokens::{NewToken, TokenDBResponse},
        users::{UserDBResponse, UserRow},
    },
};
use crate::types::{TokenId, UserId};

const TOKEN_COLUMNS: &str = "id, user_id, email, token_hash, expiry, created_at, updated_at";

pub struct Tokens<'c> {
    db: &'c mut PgConnection,
    timeout: Duration,
}

impl<'c> Tokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Persist a freshly generated token for `user`.
    ///
    /// The user's already-expired tokens are pruned first; their live sessions are kept. The
    /// stored row carries the user's current email and the token hash, never the plaintext.
    #[instrument(skip(self, token, user), fields(user_id = user.id), err)]
    pub async fn insert(&mut self, token: &NewToken, user: &UserDBResponse) -> Result<TokenDBResponse> {
        if token.user_id != user.id {
            return Err(DbError::Other(anyhow::anyhow!(
                "token was generated for user {} but is being bound to user {}",
                token.user_id,
                user.id
            )));
        }

        let limit = self.timeout;
        bounded(limit, async {
            let pruned = sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND expiry <= NOW()")
                .bind(user.id)
                .execute(&mut *self.db)
                .await?
                .rows_affected();
            if pruned > 0 {
                tracing::debug!(pruned, "removed expired tokens before issuing a new one");
            }

            let id: TokenId = sqlx::query_scalar(
                r#"
                INSERT INTO tokens (user_id, email, token_hash, expiry)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(user.id)
            .bind(&user.email)
            .bind(&token.token_hash)
            .bind(token.expiry)
            .fetch_one(&mut *self.db)
            .await?;

            let row = sqlx::query_as::<_, TokenDBResponse>(&format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;

            row.ok_or_else(|| DbError::Other(anyhow::anyhow!("token {id} was inserted but could not be read back")))
        })
        .await
    }

    /// Look up a token row by plaintext, regardless of expiry
    #[instrument(skip_all, err)]
    pub async fn get_by_token(&mut self, plaintext: &str) -> Result<Option<TokenDBResponse>> {
        let token_hash = hash_token(plaintext);
        let limit = self.timeout;
        bounded(limit, async {
            let row = sqlx::query_as::<_, TokenDBResponse>(&format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_hash = $1"))
                .bind(&token_hash)
                .fetch_optional(&mut *self.db)
                .await?;

            Ok(row)
        })
        .await
    }

    /// The active user owning a live token, if any.
    #[instrument(skip_all, err)]
    pub async fn authenticate_token(&mut self, plaintext: &str) -> Result<Option<UserDBResponse>> {
        self.authenticate_token_at(plaintext, Utc::now()).await
    }

    /// As [`Self::authenticate_token`], judging expiry against `now`. A token is live strictly
    /// before its expiry instant.
    #[instrument(skip(self, plaintext), err)]
    pub async fn authenticate_token_at(&mut self, plaintext: &str, now: DateTime<Utc>) -> Result<Option<UserDBResponse>> {
        let token_hash = hash_token(plaintext);
        let limit = self.timeout;
        bounded(limit, async {
            let user = sqlx::query_as::<_, UserRow>(
                r#"
                SELECT u.id, u.email, u.first_name, u.last_name, u.password, u.user_active, u.created_at, u.updated_at
                FROM tokens t
                INNER JOIN users u ON u.id = t.user_id
                WHERE t.token_hash = $1
                  AND t.expiry > $2
                  AND u.user_active = 1
                "#,
            )
            .bind(&token_hash)
            .bind(now)
            .fetch_optional(&mut *self.db)
            .await?;

            Ok(user.map(UserDBResponse::from))
        })
        .await
    }

    /// Whether the plaintext names a live token of an active user.
    ///
    /// Unknown, expired and inactive all come back as `Ok(false)`; only store faults are errors.
    #[instrument(skip_all, err)]
    pub async fn valid_token(&mut self, plaintext: &str) -> Result<bool> {
        Ok(self.authenticate_token(plaintext).await?.is_some())
    }

    /// Revoke a token. Unknown tokens are not an error.
    #[instrument(skip_all, err)]
    pub async fn delete_by_token(&mut self, plaintext: &str) -> Result<bool> {
        let token_hash = hash_token(plaintext);
        let limit = self.timeout;
        bounded(limit, async {
            let result = sqlx::query("DELETE FROM tokens WHERE token_hash = $1")
                .bind(&token_hash)
                .execute(&mut *self.db)
                .await?;

            Ok(result.rows_affected() > 0)
        })
        .await
    }

    /// Revoke every token held by a user
    #[instrument(skip(self), err)]
    pub async fn delete_tokens_for_user(&mut self, user_id: UserId) -> Result<u64> {
        let limit = self.timeout;
        bounded(limit, async {
            let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *self.db)
                .await?;

            Ok(result.rows_affected())
        })
        .await
    }

    /// Sweep rows whose expiry has passed. Validation never depends on this running.
    #[instrument(skip(self), err)]
    pub async fn delete_expired(&mut self) -> Result<u64> {
        let limit = self.timeout;
        bounded(limit, async {
            let result = sqlx::query("DELETE FROM tokens WHERE expiry <= NOW()")
                .execute(&mut *self.db)
                .await?;

            Ok(result.rows_affected())
        })
        .await
    }
}
