//! Database record models matching table schemas.
//!
//! This module contains struct definitions that directly correspond to database
//! table rows. These models are used by repositories to return query results
//! and accept insertion/update data.
//!
//! # Design Principles
//!
//! - **Schema Mapping**: Each model struct matches a database table schema
//! - **SQLx Integration**: Models derive `sqlx::FromRow` for query results
//! - **Separation**: Database models are distinct from API models to allow
//!   independent evolution of storage and API representations
//!
//! # Model Categories
//!
//! - [`users`]: Admin accounts and password checks
//! - [`tokens`]: Bearer session tokens (hash only once persisted)
//! - [`foods`]: Catalog foods with their country and taste set
//! - [`catalog`]: Country and taste vocabularies
//!
//! # Conversion to API Models
//!
//! Database models implement `From` conversions to API models:
//!
//! ```ignore
//! use foodapi::db::models::users::UserDBResponse;
//! use foodapi::api::models::users::UserResponse;
//!
//! let db_user: UserDBResponse = /* ... */;
//! let api_response: UserResponse = db_user.into();
//! ```

pub mod catalog;
pub mod foods;
pub mod tokens;
pub mod users;
