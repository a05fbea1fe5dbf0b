//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request deserialization
//! and response serialization. These models define the public API contract.
//!
//! # Design Principles
//!
//! - **Separation of Concerns**: API models are distinct from database models,
//!   allowing independent evolution of API and storage representations
//! - **Validation**: Models use serde for deserialization and validation
//! - **OpenAPI**: All models are annotated with `utoipa` for automatic API docs
//! - **Envelope**: Every response body is an [`envelope::ApiResponse`]
//!
//! # Model Categories
//!
//! - [`auth`]: Login, logout and token validation payloads
//! - [`users`]: Admin user profiles and the save payload
//! - [`foods`]: Foods, countries, tastes and select-box options
//! - [`envelope`]: The `{error, message, data}` wrapper

pub mod auth;
pub mod envelope;
pub mod foods;
pub mod users;
