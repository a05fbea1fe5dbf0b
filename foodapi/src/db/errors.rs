use std::time::Duration;
use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// The per-call deadline elapsed before the store answered
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// The parent row was written but its association rows were not.
    ///
    /// The parent is durable; only the relation set needs to be written again.
    #[error("{entity_type} {entity_id} saved, but its {relation} were not: {source}")]
    PartialWrite {
        entity_type: String,
        entity_id: String,
        relation: String,
        #[source]
        source: Box<DbError>,
    },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // Pool exhaustion is the store being unresponsive, same as a query deadline
            sqlx::Error::PoolTimedOut => DbError::Timeout(Duration::ZERO),
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

impl DbError {
    /// Wrap an association failure that happened after the parent row was written
    pub fn partial_write(entity_type: &str, entity_id: impl ToString, relation: &str, source: DbError) -> Self {
        DbError::PartialWrite {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            relation: relation.to_string(),
            source: Box::new(source),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DbError::Timeout(_))
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
