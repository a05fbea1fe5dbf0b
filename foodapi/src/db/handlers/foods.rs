//! Database repository for foods and their taste associations.
//!
//! A food's taste set lives in `foods_tastes`. Every write replaces the whole set: the existing
//! join rows are deleted and one row per requested taste id is inserted, both inside a single
//! transaction (a savepoint when the caller already holds one).
//!
//! The parent row and the association step are separate statements. If the association step
//! fails after the food row was written, the food stays and the call returns
//! [`DbError::PartialWrite`]; [`Foods::replace_tastes`] retries just the association step.
//! Callers that need both to land or neither should run the repository on a transaction.
//!
//! Concurrent updates of the same food's tastes are not serialized; the last writer wins.

use std::collections::BTreeSet;
use std::time::Duration;

use sqlx::{Connection, PgConnection};
use tracing::instrument;

use crate::db::{
    DEFAULT_QUERY_TIMEOUT, bounded,
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::{
        catalog::Taste,
        foods::{FoodCreateDBRequest, FoodDBResponse, FoodFilter, FoodRow, FoodUpdateDBRequest},
    },
};
use crate::slug::slugify;
use crate::types::{FoodId, TasteId};

const FOOD_SELECT: &str = r#"
    SELECT f.id, f.known_as, f.country_id, f.make_year, f.slug, f.description, f.created_at, f.updated_at,
           c.country_name, c.created_at AS country_created_at, c.updated_at AS country_updated_at
    FROM foods f
    LEFT JOIN countries c ON c.id = f.country_id
"#;

pub struct Foods<'c> {
    db: &'c mut PgConnection,
    timeout: Duration,
}

/// Collapse duplicates; the resulting order is ascending id.
fn dedup_taste_ids(ids: &[TasteId]) -> Vec<TasteId> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// The taste set currently associated with a food, ordered by label
async fn tastes_for_food(conn: &mut PgConnection, food_id: FoodId) -> Result<Vec<Taste>> {
    let tastes = sqlx::query_as::<_, Taste>(
        r#"
        SELECT id, taste, created_at, updated_at
        FROM tastes
        WHERE id IN (SELECT taste_id FROM foods_tastes WHERE food_id = $1)
        ORDER BY taste, id
        "#,
    )
    .bind(food_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(tastes)
}

async fn hydrate(conn: &mut PgConnection, row: FoodRow) -> Result<FoodDBResponse> {
    let tastes = tastes_for_food(conn, row.id).await?;
    Ok(FoodDBResponse::from((row, tastes)))
}

async fn fetch_food(conn: &mut PgConnection, id: FoodId) -> Result<Option<FoodDBResponse>> {
    let row = sqlx::query_as::<_, FoodRow>(&format!("{FOOD_SELECT} WHERE f.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, row).await?)),
        None => Ok(None),
    }
}

/// Fail with a foreign key error before any write if a requested taste does not exist.
async fn ensure_tastes_exist(conn: &mut PgConnection, taste_ids: &[TasteId]) -> Result<()> {
    if taste_ids.is_empty() {
        return Ok(());
    }

    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tastes WHERE id = ANY($1)")
        .bind(taste_ids)
        .fetch_one(&mut *conn)
        .await?;

    if found != taste_ids.len() as i64 {
        return Err(DbError::ForeignKeyViolation {
            constraint: Some("foods_tastes_taste_id_fkey".to_string()),
            table: Some("foods_tastes".to_string()),
            message: format!("unknown taste id in {taste_ids:?}"),
        });
    }
    Ok(())
}

/// Replace the association set of `food_id` with exactly `taste_ids`.
async fn sync_tastes(conn: &mut PgConnection, food_id: FoodId, taste_ids: &[TasteId]) -> Result<()> {
    let mut tx = conn.begin().await?;

    sqlx::query("DELETE FROM foods_tastes WHERE food_id = $1")
        .bind(food_id)
        .execute(&mut *tx)
        .await?;

    if !taste_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO foods_tastes (food_id, taste_id, created_at, updated_at)
            SELECT $1, taste_id, NOW(), NOW() FROM UNNEST($2::int4[]) AS taste_id
            "#,
        )
        .bind(food_id)
        .bind(taste_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[async_trait::async_trait]
impl<'c> Repository for Foods<'c> {
    type CreateRequest = FoodCreateDBRequest;
    type UpdateRequest = FoodUpdateDBRequest;
    type Response = FoodDBResponse;
    type Id = FoodId;
    type Filter = FoodFilter;

    /// Insert a food, deriving its slug, then associate tastes if any were given.
    #[instrument(skip(self, request), fields(known_as = %request.known_as), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let limit = self.timeout;
        let slug = slugify(&request.known_as);
        let taste_ids = dedup_taste_ids(&request.taste_ids);

        let id: FoodId = bounded(limit, async {
            ensure_tastes_exist(&mut *self.db, &taste_ids).await?;

            let id = sqlx::query_scalar::<_, FoodId>(
                r#"
                INSERT INTO foods (known_as, country_id, make_year, slug, description)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(&request.known_as)
            .bind(request.country_id)
            .bind(request.make_year)
            .bind(&slug)
            .bind(&request.description)
            .fetch_one(&mut *self.db)
            .await?;

            Ok(id)
        })
        .await?;

        if !taste_ids.is_empty() {
            bounded(limit, sync_tastes(&mut *self.db, id, &taste_ids))
                .await
                .map_err(|e| DbError::partial_write("food", id, "tastes", e))?;
        }

        bounded(limit, fetch_food(&mut *self.db, id))
            .await?
            .ok_or_else(|| DbError::Other(anyhow::anyhow!("food {id} was inserted but could not be read back")))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        bounded(self.timeout, fetch_food(&mut *self.db, id)).await
    }

    /// Foods ordered by display name, each with its country and taste set.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let limit = self.timeout;
        bounded(limit, async {
            let rows = sqlx::query_as::<_, FoodRow>(&format!("{FOOD_SELECT} ORDER BY f.known_as, f.id LIMIT $1 OFFSET $2"))
                .bind(filter.limit)
                .bind(filter.skip)
                .fetch_all(&mut *self.db)
                .await?;

            let mut foods = Vec::with_capacity(rows.len());
            for row in rows {
                foods.push(hydrate(&mut *self.db, row).await?);
            }
            Ok(foods)
        })
        .await
    }

    /// Remove a food and its join rows together.
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let limit = self.timeout;
        bounded(limit, async {
            let mut tx = self.db.begin().await?;

            sqlx::query("DELETE FROM foods_tastes WHERE food_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            let result = sqlx::query("DELETE FROM foods WHERE id = $1").bind(id).execute(&mut *tx).await?;

            tx.commit().await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    /// Rewrite a food's fields and slug, then replace its taste set (an empty set clears it).
    #[instrument(skip(self, request), fields(known_as = %request.known_as), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let limit = self.timeout;
        let slug = slugify(&request.known_as);
        let taste_ids = dedup_taste_ids(&request.taste_ids);

        bounded(limit, async {
            ensure_tastes_exist(&mut *self.db, &taste_ids).await?;

            sqlx::query_scalar::<_, FoodId>(
                r#"
                UPDATE foods SET
                    known_as = $2,
                    country_id = $3,
                    make_year = $4,
                    slug = $5,
                    description = $6,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(id)
            .bind(&request.known_as)
            .bind(request.country_id)
            .bind(request.make_year)
            .bind(&slug)
            .bind(&request.description)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

            Ok(())
        })
        .await?;

        bounded(limit, sync_tastes(&mut *self.db, id, &taste_ids))
            .await
            .map_err(|e| DbError::partial_write("food", id, "tastes", e))?;

        bounded(limit, fetch_food(&mut *self.db, id)).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Foods<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_slug(&mut self, slug: &str) -> Result<Option<FoodDBResponse>> {
        let limit = self.timeout;
        bounded(limit, async {
            let row = sqlx::query_as::<_, FoodRow>(&format!("{FOOD_SELECT} WHERE f.slug = $1"))
                .bind(slug)
                .fetch_optional(&mut *self.db)
                .await?;

            match row {
                Some(row) => Ok(Some(hydrate(&mut *self.db, row).await?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Replace only the taste set of an existing food.
    ///
    /// This is the retry path after a [`DbError::PartialWrite`].
    #[instrument(skip(self, taste_ids), fields(count = taste_ids.len()), err)]
    pub async fn replace_tastes(&mut self, food_id: FoodId, taste_ids: &[TasteId]) -> Result<()> {
        let limit = self.timeout;
        let taste_ids = dedup_taste_ids(taste_ids);

        bounded(limit, async {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM foods WHERE id = $1)")
                .bind(food_id)
                .fetch_one(&mut *self.db)
                .await?;
            if !exists {
                return Err(DbError::NotFound);
            }

            ensure_tastes_exist(&mut *self.db, &taste_ids).await?;
            sync_tastes(&mut *self.db, food_id, &taste_ids).await
        })
        .await
    }

    #[instrument(skip(self), err)]
    pub async fn tastes_for_food(&mut self, food_id: FoodId) -> Result<Vec<Taste>> {
        bounded(self.timeout, tastes_for_food(&mut *self.db, food_id)).await
    }
}
