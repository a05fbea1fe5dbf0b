//! API request/response models for login, logout and token checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::users::UserResponse;
use crate::db::models::tokens::{NewToken, TokenDBResponse};
use crate::types::{TokenId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A token as handed to the client once at login. The hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub id: TokenId,
    pub user_id: UserId,
    pub email: String,
    /// Plaintext bearer value; this is the only time it leaves the server
    pub token: String,
    pub expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(NewToken, TokenDBResponse)> for TokenResponse {
    fn from((issued, row): (NewToken, TokenDBResponse)) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            token: issued.plaintext,
            expiry: row.expiry,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `data` of a successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: TokenResponse,
    pub user: UserResponse,
}

/// Body carrying a plaintext token, for logout and validation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: String,
}
