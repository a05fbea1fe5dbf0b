//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries, token and taste bookkeeping)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Deadlines
//!
//! Every repository call is bounded by a per-call deadline (see [`bounded`]). When the deadline
//! elapses the query future is dropped, which cancels the statement, and the call fails with
//! [`errors::DbError::Timeout`]. Nothing is retried.
//!
//! ```ignore
//! use foodapi::db::handlers::{Foods, Repository};
//!
//! let mut conn = pool.acquire().await?;
//! let mut foods = Foods::new(&mut conn).with_timeout(config.query_timeout);
//! let food = foods.get_by_slug("hamburger").await?;
//! ```
//!
//! # Transactions
//!
//! Repositories take a `&mut PgConnection`, so they run equally on a pooled connection or on a
//! transaction. Multi-statement writes open their own transaction with `begin()`, which becomes a
//! savepoint when the caller already holds one:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let id = Foods::new(&mut tx).create(&request).await?.id;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/` directory.
//! The [`crate::migrator`] function provides access to the migrator:
//!
//! ```ignore
//! foodapi::migrator().run(&pool).await?;
//! ```

use std::future::Future;
use std::time::Duration;

pub mod errors;
pub mod handlers;
pub mod models;

use errors::{DbError, Result};

/// Deadline applied to a repository call when none is configured.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Run a database future under a deadline.
///
/// On expiry the future is dropped (aborting the in-flight statement, and rolling back any
/// transaction it opened) and [`DbError::Timeout`] is returned.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout = ?limit, "database call exceeded its deadline");
            Err(DbError::Timeout(limit))
        }
    }
}
