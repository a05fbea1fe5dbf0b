//! Database models for users.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::auth::password::{self, Argon2Params};
use crate::errors::Error;
use crate::types::{UserId, flag_to_bool};

/// Database request for creating a new user
///
/// Carries the plaintext password; the repository hashes it before anything is written.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub active: bool,
    pub argon2_params: Argon2Params,
}

/// Database request for updating a user's profile fields.
///
/// The password is changed separately via `Users::reset_password`.
#[derive(Debug, Clone)]
pub struct UserUpdateDBRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
}

/// Row as stored in the `users` table
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub user_active: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserDBResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password,
            active: flag_to_bool(row.user_active),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl UserDBResponse {
    /// Check a candidate password against the stored hash.
    ///
    /// A mismatch is `Ok(false)`; a stored hash that cannot be parsed is an error.
    /// Argon2 is deliberately slow, so async callers should run this on a blocking thread.
    pub fn password_matches(&self, candidate: &str) -> Result<bool, Error> {
        password::verify_string(candidate, &self.password_hash)
    }
}
