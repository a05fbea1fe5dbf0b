//! Repositories for the country and taste vocabularies.

use std::time::Duration;

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    DEFAULT_QUERY_TIMEOUT, bounded,
    errors::Result,
    models::catalog::{Country, Taste},
};
use crate::types::CountryId;

pub struct Countries<'c> {
    db: &'c mut PgConnection,
    timeout: Duration,
}

impl<'c> Countries<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Every country, ordered by name
    #[instrument(skip(self), err)]
    pub async fn all(&mut self) -> Result<Vec<Country>> {
        let limit = self.timeout;
        bounded(limit, async {
            let countries = sqlx::query_as::<_, Country>(
                "SELECT id, country_name, created_at, updated_at FROM countries ORDER BY country_name, id",
            )
            .fetch_all(&mut *self.db)
            .await?;

            Ok(countries)
        })
        .await
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: CountryId) -> Result<Option<Country>> {
        let limit = self.timeout;
        bounded(limit, async {
            let country = sqlx::query_as::<_, Country>("SELECT id, country_name, created_at, updated_at FROM countries WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;

            Ok(country)
        })
        .await
    }

    #[instrument(skip(self), err)]
    pub async fn create(&mut self, country_name: &str) -> Result<Country> {
        let limit = self.timeout;
        bounded(limit, async {
            let country = sqlx::query_as::<_, Country>(
                "INSERT INTO countries (country_name) VALUES ($1) RETURNING id, country_name, created_at, updated_at",
            )
            .bind(country_name)
            .fetch_one(&mut *self.db)
            .await?;

            Ok(country)
        })
        .await
    }
}

pub struct Tastes<'c> {
    db: &'c mut PgConnection,
    timeout: Duration,
}

impl<'c> Tastes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The whole taste vocabulary, ordered by label
    #[instrument(skip(self), err)]
    pub async fn all(&mut self) -> Result<Vec<Taste>> {
        let limit = self.timeout;
        bounded(limit, async {
            let tastes = sqlx::query_as::<_, Taste>("SELECT id, taste, created_at, updated_at FROM tastes ORDER BY taste, id")
                .fetch_all(&mut *self.db)
                .await?;

            Ok(tastes)
        })
        .await
    }
}
