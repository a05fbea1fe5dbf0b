//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication checks (via the [`CurrentUser`](crate::api::models::users::CurrentUser) extractor)
//! - Business logic execution via database repositories
//! - Response serialization into the `{error, message, data}` envelope
//!
//! # Handler Modules
//!
//! - [`auth`]: Login, logout and token validation
//! - [`catalog`]: Country and taste select options
//! - [`foods`]: Public food listing and lookup, admin food editing
//! - [`users`]: Admin user management and forced logout
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error envelopes.

pub mod auth;
pub mod catalog;
pub mod foods;
pub mod users;
