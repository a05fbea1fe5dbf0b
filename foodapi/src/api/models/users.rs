//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::{UserId, active_flag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated caller, placed in request extensions by the bearer middleware
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            first_name: db.first_name,
            last_name: db.last_name,
        }
    }
}

/// Insert-or-update payload for `/admin/users/save`.
///
/// `id` of 0 (or absent) inserts. On update a non-empty `password` also resets the password.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSave {
    #[serde(default)]
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub password: String,
    /// 0 or 1; booleans are accepted too
    #[serde(with = "active_flag")]
    #[schema(value_type = i32)]
    pub active: bool,
}

// User response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "active_flag")]
    #[schema(value_type = i32)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            first_name: db.first_name,
            last_name: db.last_name,
            active: db.active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// `data` of the user listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsersList {
    pub users: Vec<UserResponse>,
}

/// A bare `{ "id": n }` body, used by the delete endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct IdRequest {
    pub id: i32,
}
