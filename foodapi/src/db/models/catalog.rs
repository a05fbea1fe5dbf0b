//! Database models for the reference vocabularies: countries and tastes.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{CountryId, TasteId};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Country {
    pub id: CountryId,
    pub country_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Taste {
    pub id: TasteId,
    pub taste: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
