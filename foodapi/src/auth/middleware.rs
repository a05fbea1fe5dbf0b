use crate::{AppState, api::models::users::CurrentUser, errors::Error};
use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::trace;

/// Implementation for require_bearer_middleware. Authenticates the request and stashes the
/// caller in the request extensions so handlers don't repeat the token lookup.
pub(crate) async fn require_bearer(state: AppState, request: Request) -> Result<Request, Error> {
    let (mut parts, body) = request.into_parts();
    let current_user = CurrentUser::from_request_parts(&mut parts, &state).await?;
    trace!("Authenticated user: {}", current_user.email);

    parts.extensions.insert(current_user);
    Ok(Request::from_parts(parts, body))
}

/// Middleware guarding the /admin routes. Rejects with 401 before any handler or
/// repository runs unless a live session token is presented.
pub async fn require_bearer_middleware(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let request = require_bearer(state, request).await?;
    Ok(next.run(request).await)
}
