use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::{
        auth::{LoginRequest, LoginResponse, TokenRequest, TokenResponse},
        envelope::ApiResponse,
        users::UserResponse,
    },
    auth::tokens::generate_token,
    db::{
        errors::DbError,
        handlers::{Tokens, Users},
    },
    errors::Error,
};

/// Log in with email and password, receiving a bearer token
///
/// Unknown email, wrong password, inactive account and a failed lookup all produce the same error.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<ApiResponse<LoginResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| {
        tracing::warn!("login could not reach the database: {e}");
        Error::invalid_credentials()
    })?;
    let timeout = state.config.query_timeout;

    // Lookup faults read the same as an unknown email
    let user = match Users::new(&mut conn).with_timeout(timeout).get_user_by_email(&request.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Error::invalid_credentials()),
        Err(e) => {
            tracing::warn!("login lookup failed: {e}");
            return Err(Error::invalid_credentials());
        }
    };

    // Verify on a blocking thread; argon2 is deliberately slow
    let candidate = request.password;
    let hash_holder = user.clone();
    let matches = tokio::task::spawn_blocking(move || hash_holder.password_matches(&candidate))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?;

    match matches {
        Ok(true) => {}
        Ok(false) => return Err(Error::invalid_credentials()),
        Err(e) => {
            tracing::warn!(user_id = user.id, "stored password hash could not be checked: {e}");
            return Err(Error::invalid_credentials());
        }
    }

    if !user.active {
        tracing::debug!(user_id = user.id, "login refused for inactive user");
        return Err(Error::invalid_credentials());
    }

    let issued = generate_token(user.id, state.config.auth.tokens.ttl)?;
    let row = Tokens::new(&mut conn).with_timeout(timeout).insert(&issued, &user).await?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(ApiResponse::ok(
        "logged in",
        LoginResponse {
            token: TokenResponse::from((issued, row)),
            user: UserResponse::from(user),
        },
    )))
}

/// Revoke a token. Succeeds even if the token is unknown.
#[utoipa::path(
    post,
    path = "/users/logout",
    request_body = TokenRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Logged out"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, Json(request): Json<TokenRequest>) -> Json<ApiResponse<()>> {
    let revoked: Result<bool, DbError> = match state.db.acquire().await {
        Ok(mut conn) => {
            Tokens::new(&mut conn)
                .with_timeout(state.config.query_timeout)
                .delete_by_token(&request.token)
                .await
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = revoked {
        tracing::warn!("logout could not revoke token: {e}");
    }

    Json(ApiResponse::message("logged out"))
}

/// Report whether a token is currently valid
///
/// Store faults are reported as `false` rather than as an error.
#[utoipa::path(
    post,
    path = "/validate-token",
    request_body = TokenRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Validity of the token", body = ApiResponse<bool>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn validate_token(State(state): State<AppState>, Json(request): Json<TokenRequest>) -> (StatusCode, Json<ApiResponse<bool>>) {
    let valid = match state.db.acquire().await {
        Ok(mut conn) => Tokens::new(&mut conn)
            .with_timeout(state.config.query_timeout)
            .valid_token(&request.token)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("token validation failed: {e}");
                false
            }),
        Err(e) => {
            tracing::warn!("token validation could not reach the database: {e}");
            false
        }
    };

    (StatusCode::OK, Json(ApiResponse::ok("", valid)))
}
