use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        envelope::ApiResponse,
        users::{CurrentUser, IdRequest, UserResponse, UserSave, UsersList},
    },
    auth::password::{self, Argon2Params},
    db::{
        handlers::{Repository, Tokens, Users, users::UserFilter},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
    types::UserId,
};

fn validate_profile(request: &UserSave) -> Result<(), Error> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "First and last name are required".to_string(),
        });
    }
    Ok(())
}

/// List all users
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = ApiResponse<UsersList>),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, _current_user: CurrentUser) -> Result<Json<ApiResponse<UsersList>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let users = Users::new(&mut conn)
        .with_timeout(state.config.query_timeout)
        .list(&UserFilter::default())
        .await?;

    Ok(Json(ApiResponse::ok(
        "success",
        UsersList {
            users: users.into_iter().map(UserResponse::from).collect(),
        },
    )))
}

/// Insert a user (id 0) or update an existing one
///
/// On update, a non-empty password resets it, and deactivating the user revokes every token
/// they hold.
#[utoipa::path(
    post,
    path = "/admin/users/save",
    request_body = UserSave,
    tag = "users",
    responses(
        (status = 202, description = "Changes saved"),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = request.id))]
pub async fn save_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UserSave>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Error> {
    validate_profile(&request)?;
    let password_config = &state.config.auth.password;
    let timeout = state.config.query_timeout;
    let params = Argon2Params::from(password_config);

    if request.id == 0 {
        password::validate_password(&request.password, password_config)?;

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let created = Users::new(&mut conn)
            .with_timeout(timeout)
            .create(&UserCreateDBRequest {
                email: request.email.trim().to_string(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                password: request.password,
                active: request.active,
                argon2_params: params,
            })
            .await?;
        tracing::info!(user_id = created.id, by = current_user.id, "user created");
    } else {
        if !request.password.is_empty() {
            password::validate_password(&request.password, password_config)?;
        }

        let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
        Users::new(&mut tx)
            .with_timeout(timeout)
            .update(
                request.id,
                &UserUpdateDBRequest {
                    email: request.email.trim().to_string(),
                    first_name: request.first_name.trim().to_string(),
                    last_name: request.last_name.trim().to_string(),
                    active: request.active,
                },
            )
            .await?;

        if !request.password.is_empty() {
            Users::new(&mut tx)
                .with_timeout(timeout)
                .reset_password(request.id, &request.password, params)
                .await?;
        }

        if !request.active {
            let revoked = Tokens::new(&mut tx).with_timeout(timeout).delete_tokens_for_user(request.id).await?;
            tracing::debug!(user_id = request.id, revoked, "revoked tokens of deactivated user");
        }

        tx.commit().await.map_err(|e| Error::Database(e.into()))?;
        tracing::info!(user_id = request.id, by = current_user.id, "user updated");
    }

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::message("Changes saved"))))
}

/// Get one user by id
#[utoipa::path(
    get,
    path = "/admin/users/get/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    _current_user: CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .with_timeout(state.config.query_timeout)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(ApiResponse::ok("", UserResponse::from(user))))
}

/// Delete a user and their tokens
#[utoipa::path(
    post,
    path = "/admin/users/delete",
    request_body = IdRequest,
    tag = "users",
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Users cannot delete themselves"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = request.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<IdRequest>,
) -> Result<Json<ApiResponse<()>>, Error> {
    if request.id == current_user.id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Users::new(&mut conn).with_timeout(state.config.query_timeout).delete(request.id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: request.id.to_string(),
        });
    }

    tracing::info!(user_id = request.id, by = current_user.id, "user deleted");
    Ok(Json(ApiResponse::message("User deleted")))
}

/// Deactivate a user and revoke all their tokens
#[utoipa::path(
    post,
    path = "/admin/log-user-out/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 202, description = "User logged out and set to inactive"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn log_user_out(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    current_user: CurrentUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Error> {
    let timeout = state.config.query_timeout;
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    Users::new(&mut tx).with_timeout(timeout).set_active(id, false).await?;
    let revoked = Tokens::new(&mut tx).with_timeout(timeout).delete_tokens_for_user(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    tracing::info!(user_id = id, revoked, by = current_user.id, "user logged out and deactivated");

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::message("user logged out and set to inactive"))))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{envelope::ApiResponse, users::UsersList},
        db::handlers::{Repository, Tokens, Users},
        test_utils::{create_test_app, create_test_user, login_token},
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_routes_require_bearer(pool: PgPool) {
        let (server, _bg) = create_test_app(pool).await;

        server.get("/admin/users").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/admin/users/delete")
            .json(&json!({ "id": 1 }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        let response = server.get("/admin/users").authorization_bearer("not-a-token").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ApiResponse<()> = response.json();
        assert!(body.error);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_users(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        create_test_user(&pool, "other@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        let response = server.get("/admin/users").authorization_bearer(&token).await;
        response.assert_status_ok();
        let body: ApiResponse<UsersList> = response.json();
        let users = body.data.unwrap().users;
        assert_eq!(users.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_save_user_insert_then_update(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool.clone()).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        let response = server
            .post("/admin/users/save")
            .authorization_bearer(&token)
            .json(&json!({
                "id": 0,
                "email": "new@example.com",
                "first_name": "New",
                "last_name": "User",
                "password": "brandnewpw",
                "active": 1
            }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        let body: ApiResponse<()> = response.json();
        assert_eq!(body.message, "Changes saved");

        let mut conn = pool.acquire().await.unwrap();
        let created = Users::new(&mut conn).get_user_by_email("new@example.com").await.unwrap().unwrap();
        assert!(created.password_matches("brandnewpw").unwrap());

        // Update without a password keeps the old one
        server
            .post("/admin/users/save")
            .authorization_bearer(&token)
            .json(&json!({
                "id": created.id,
                "email": "new@example.com",
                "first_name": "Renamed",
                "last_name": "User",
                "password": "",
                "active": 1
            }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let updated = Users::new(&mut conn).get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Renamed");
        assert!(updated.password_matches("brandnewpw").unwrap());

        // A non-empty password resets it
        server
            .post("/admin/users/save")
            .authorization_bearer(&token)
            .json(&json!({
                "id": created.id,
                "email": "new@example.com",
                "first_name": "Renamed",
                "last_name": "User",
                "password": "anotherpw1",
                "active": 1
            }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let updated = Users::new(&mut conn).get_by_id(created.id).await.unwrap().unwrap();
        assert!(updated.password_matches("anotherpw1").unwrap());
        assert!(!updated.password_matches("brandnewpw").unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_save_user_rejects_bad_input(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        let short_password = json!({
            "email": "new@example.com", "first_name": "New", "last_name": "User", "password": "short", "active": 1
        });
        server
            .post("/admin/users/save")
            .authorization_bearer(&token)
            .json(&short_password)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let duplicate = json!({
            "email": "admin@example.com", "first_name": "Dup", "last_name": "User", "password": "longenough", "active": 1
        });
        server
            .post("/admin/users/save")
            .authorization_bearer(&token)
            .json(&duplicate)
            .await
            .assert_status(StatusCode::CONFLICT);

        let unknown = json!({
            "id": 9999, "email": "x@example.com", "first_name": "X", "last_name": "Y", "active": 1
        });
        server
            .post("/admin/users/save")
            .authorization_bearer(&token)
            .json(&unknown)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deactivating_via_save_revokes_tokens(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let other = create_test_user(&pool, "other@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool.clone()).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;
        let other_token = login_token(&server, "other@example.com", "verysecret").await;

        server
            .post("/admin/users/save")
            .authorization_bearer(&token)
            .json(&json!({
                "id": other.id,
                "email": "other@example.com",
                "first_name": other.first_name,
                "last_name": other.last_name,
                "active": 0
            }))
            .await
            .assert_status(StatusCode::ACCEPTED);

        let mut conn = pool.acquire().await.unwrap();
        assert!(!Tokens::new(&mut conn).valid_token(&other_token).await.unwrap());
        assert!(Tokens::new(&mut conn).get_by_token(&other_token).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_and_delete_user(pool: PgPool) {
        let admin = create_test_user(&pool, "admin@example.com", "verysecret").await;
        let other = create_test_user(&pool, "other@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        let response = server
            .get(&format!("/admin/users/get/{}", other.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["email"], "other@example.com");
        assert!(body["data"].get("password").is_none());

        server
            .post("/admin/users/delete")
            .authorization_bearer(&token)
            .json(&json!({ "id": admin.id }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/admin/users/delete")
            .authorization_bearer(&token)
            .json(&json!({ "id": other.id }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<()> = response.json();
        assert_eq!(body.message, "User deleted");

        server
            .get(&format!("/admin/users/get/{}", other.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .post("/admin/users/delete")
            .authorization_bearer(&token)
            .json(&json!({ "id": other.id }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_log_user_out(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let other = create_test_user(&pool, "other@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool.clone()).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;
        let other_token = login_token(&server, "other@example.com", "verysecret").await;

        let response = server
            .post(&format!("/admin/log-user-out/{}", other.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        let body: ApiResponse<()> = response.json();
        assert_eq!(body.message, "user logged out and set to inactive");

        let mut conn = pool.acquire().await.unwrap();
        let reloaded = Users::new(&mut conn).get_by_id(other.id).await.unwrap().unwrap();
        assert!(!reloaded.active);

        server
            .get("/admin/users")
            .authorization_bearer(&other_token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/admin/log-user-out/9999")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
