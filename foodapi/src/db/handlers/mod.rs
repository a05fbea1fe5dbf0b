//! Repository implementations for database access.
//!
//! This module provides repository structs for each entity in the system.
//! Repositories follow a consistent pattern and, where the entity has a full
//! CRUD surface, implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed operations
//! - Handles query construction and parameter binding
//! - Returns domain models from [`crate::db::models`]
//! - Bounds every call by its deadline (see [`crate::db::bounded`])
//!
//! # Available Repositories
//!
//! - [`Users`]: Admin accounts, password resets
//! - [`Tokens`]: Bearer token issuance, validation and revocation
//! - [`Foods`]: Catalog foods and their taste associations
//! - [`Countries`], [`Tastes`]: Reference vocabularies
//!
//! # Common Pattern
//!
//! ```ignore
//! use foodapi::db::handlers::{Users, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = pool.acquire().await?;
//!     let mut repo = Users::new(&mut conn);
//!     let users = repo.list(&Default::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod foods;
pub mod repository;
pub mod tokens;
pub mod users;

pub use catalog::{Countries, Tastes};
pub use foods::Foods;
pub use repository::Repository;
pub use tokens::Tokens;
pub use users::Users;
