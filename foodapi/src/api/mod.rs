//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/users/login`, `/users/logout`, `/validate-token`): session tokens
//! - **Foods** (`/foods`, `/foods/{slug}`): public, read-only catalog
//! - **Admin** (`/admin/*`): user management, food editing and select options; every route
//!   requires `Authorization: Bearer <token>`
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
