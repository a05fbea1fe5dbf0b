//! Database models for foods.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::models::catalog::{Country, Taste};
use crate::errors::Error;
use crate::types::{CountryId, FoodId, TasteId};

/// Database request for creating a food.
///
/// The slug is not part of the request; it is always derived from `known_as`.
#[derive(Debug, Clone, Default)]
pub struct FoodCreateDBRequest {
    pub known_as: String,
    pub country_id: Option<CountryId>,
    pub make_year: i32,
    pub description: String,
    /// Taste ids to associate. Empty means no associations are written.
    pub taste_ids: Vec<TasteId>,
}

/// Database request for updating a food.
///
/// `taste_ids` always replaces the stored set, so an empty vec clears it.
#[derive(Debug, Clone, Default)]
pub struct FoodUpdateDBRequest {
    pub known_as: String,
    pub country_id: Option<CountryId>,
    pub make_year: i32,
    pub description: String,
    pub taste_ids: Vec<TasteId>,
}

/// Filter for listing foods. Foods are always ordered by `known_as`.
#[derive(Debug, Clone, Default)]
pub struct FoodFilter {
    pub skip: i64,
    pub limit: Option<i64>,
}

impl FoodFilter {
    /// Every food, unpaginated
    pub fn all() -> Self {
        Self::default()
    }

    /// One 1-based page of `page_size` foods.
    pub fn page(page: i64, page_size: i64) -> Result<Self, Error> {
        if page < 1 {
            return Err(Error::BadRequest {
                message: format!("page must be at least 1, got {page}"),
            });
        }
        if page_size < 1 {
            return Err(Error::BadRequest {
                message: format!("page size must be at least 1, got {page_size}"),
            });
        }
        let skip = (page - 1).checked_mul(page_size).ok_or_else(|| Error::BadRequest {
            message: "page is out of range".to_string(),
        })?;

        Ok(Self {
            skip,
            limit: Some(page_size),
        })
    }
}

/// A `foods` row left-joined with its country
#[derive(Debug, Clone, FromRow)]
pub(crate) struct FoodRow {
    pub id: FoodId,
    pub known_as: String,
    pub country_id: Option<CountryId>,
    pub make_year: i32,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub country_name: Option<String>,
    pub country_created_at: Option<DateTime<Utc>>,
    pub country_updated_at: Option<DateTime<Utc>>,
}

impl FoodRow {
    /// The joined country, if the reference resolved
    pub fn country(&self) -> Option<Country> {
        match (self.country_id, &self.country_name, self.country_created_at, self.country_updated_at) {
            (Some(id), Some(name), Some(created_at), Some(updated_at)) => Some(Country {
                id,
                country_name: name.clone(),
                created_at,
                updated_at,
            }),
            _ => None,
        }
    }
}

/// Database response for a food, hydrated with its country and taste set
#[derive(Debug, Clone)]
pub struct FoodDBResponse {
    pub id: FoodId,
    pub known_as: String,
    pub slug: String,
    pub description: String,
    pub make_year: i32,
    pub country_id: Option<CountryId>,
    pub country: Option<Country>,
    pub tastes: Vec<Taste>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(FoodRow, Vec<Taste>)> for FoodDBResponse {
    fn from((row, tastes): (FoodRow, Vec<Taste>)) -> Self {
        let country = row.country();
        Self {
            id: row.id,
            known_as: row.known_as,
            slug: row.slug,
            description: row.description,
            make_year: row.make_year,
            country_id: row.country_id,
            country,
            tastes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl FoodDBResponse {
    pub fn taste_ids(&self) -> Vec<TasteId> {
        self.tastes.iter().map(|t| t.id).collect()
    }
}
