use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::tokens::parse_bearer,
    db::{errors::DbError, handlers::Tokens},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Extract user from a session token in the Authorization header
/// Returns:
/// - None: No Authorization header, or not a well-formed Bearer value
/// - Some(Ok(user)): Token is known, unexpired and its user is active
/// - Some(Err(error)): Bearer token present but rejected, or the lookup failed
#[instrument(skip(parts, db))]
async fn try_bearer_token_auth(parts: &Parts, db: &PgPool, timeout: Duration) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            trace!("Unreadable authorization header: {e}");
            return None;
        }
    };

    let token = parse_bearer(auth_str)?;

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };
    let mut tokens = Tokens::new(&mut conn).with_timeout(timeout);

    match tokens.authenticate_token(token).await {
        Ok(Some(user)) => Some(Ok(user.into())),
        Ok(None) => Some(Err(Error::Unauthenticated { message: None })),
        Err(e) => Some(Err(e.into())),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // The bearer middleware has already done the lookup for /admin routes
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        match try_bearer_token_auth(parts, &state.db, state.config.query_timeout).await {
            Some(Ok(user)) => {
                debug!("Found token authenticated user: {}", user.id);
                Ok(user)
            }
            Some(Err(e)) => {
                trace!("Token authentication failed: {:?}", e);
                Err(e)
            }
            None => {
                trace!("No bearer token presented");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}
