//! Database repository for users.

use std::time::Duration;

use sqlx::{Connection, PgConnection};
use tracing::instrument;

use crate::auth::password::{self, Argon2Params};
use crate::db::{
    DEFAULT_QUERY_TIMEOUT, bounded,
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserRow, UserUpdateDBRequest},
};
use crate::types::{UserId, bool_to_flag};

/// Filter for listing users. Users are listed alphabetically by last name, then first name.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: Option<i64>,
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, password, user_active, created_at, updated_at";

pub struct Users<'c> {
    db: &'c mut PgConnection,
    timeout: Duration,
}

/// Hash on a blocking thread; argon2 takes tens of milliseconds by design.
async fn hash_password(plaintext: &str, params: Argon2Params) -> Result<String> {
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || password::hash_string_with_params(&plaintext, Some(params)))
        .await
        .map_err(|e| DbError::Other(anyhow::anyhow!("password hashing task failed: {e}")))?
        .map_err(|e| DbError::Other(anyhow::anyhow!(e)))
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let password_hash = hash_password(&request.password, request.argon2_params).await?;
        let limit = self.timeout;

        bounded(limit, async {
            let user = sqlx::query_as::<_, UserRow>(&format!(
                r#"
                INSERT INTO users (email, first_name, last_name, password, user_active)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(&request.email)
            .bind(&request.first_name)
            .bind(&request.last_name)
            .bind(&password_hash)
            .bind(bool_to_flag(request.active))
            .fetch_one(&mut *self.db)
            .await?;

            Ok(UserDBResponse::from(user))
        })
        .await
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let limit = self.timeout;
        bounded(limit, async {
            let user = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;

            Ok(user.map(UserDBResponse::from))
        })
        .await
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let limit = self.timeout;
        bounded(limit, async {
            // LIMIT NULL is no limit in postgres
            let users = sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name, id LIMIT $1 OFFSET $2"
            ))
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

            Ok(users.into_iter().map(UserDBResponse::from).collect())
        })
        .await
    }

    /// Delete a user together with every token they hold.
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let limit = self.timeout;
        bounded(limit, async {
            let mut tx = self.db.begin().await?;

            sqlx::query("DELETE FROM tokens WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *tx).await?;

            tx.commit().await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let limit = self.timeout;
        bounded(limit, async {
            let user = sqlx::query_as::<_, UserRow>(&format!(
                r#"
                UPDATE users SET
                    email = $2,
                    first_name = $3,
                    last_name = $4,
                    user_active = $5,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(id)
            .bind(&request.email)
            .bind(&request.first_name)
            .bind(&request.last_name)
            .bind(bool_to_flag(request.active))
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

            Ok(UserDBResponse::from(user))
        })
        .await
    }
}

impl<'c> Users<'c> {
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

    /// Exact, case-sensitive lookup by email
    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let limit = self.timeout;
        bounded(limit, async {
            let user = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&mut *self.db)
                .await?;

            Ok(user.map(UserDBResponse::from))
        })
        .await
    }

    /// Replace a user's password. The plaintext is hashed first and never stored.
    #[instrument(skip(self, new_password, params), err)]
    pub async fn reset_password(&mut self, id: UserId, new_password: &str, params: Argon2Params) -> Result<()> {
        let password_hash = hash_password(new_password, params).await?;
        let limit = self.timeout;

        bounded(limit, async {
            let result = sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(&password_hash)
                .execute(&mut *self.db)
                .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::NotFound);
            }
            Ok(())
        })
        .await
    }

    /// Flip only the active flag, leaving the profile untouched
    #[instrument(skip(self), err)]
    pub async fn set_active(&mut self, id: UserId, active: bool) -> Result<()> {
        let limit = self.timeout;
        bounded(limit, async {
            let result = sqlx::query("UPDATE users SET user_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(bool_to_flag(active))
                .execute(&mut *self.db)
                .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::NotFound);
            }
            Ok(())
        })
        .await
    }
}
