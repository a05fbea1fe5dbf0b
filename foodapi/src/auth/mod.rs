//! Authentication for the admin surface.
//!
//! Users log in with email and password at `/users/login` and receive an opaque bearer token.
//! Only the SHA-256 of the token is stored. A token authenticates while it is unexpired and its
//! user is active; logging out, deactivating the user or deleting the user revokes it.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for getting the authenticated user in handlers
//! - [`middleware`]: Route protection middleware for `/admin`
//! - [`password`]: Password hashing and verification using Argon2
//! - [`tokens`]: Token generation, hashing and `Authorization` header parsing
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use foodapi::api::models::users::CurrentUser;
//! use axum::extract::State;
//!
//! async fn protected_handler(
//!     State(state): State<AppState>,
//!     user: CurrentUser,
//! ) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", user.first_name))
//! }
//! ```

pub mod current_user;
pub mod middleware;
pub mod password;
pub mod tokens;
