//! API request/response models for foods and the catalog vocabularies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::catalog::{Country, Taste};
use crate::db::models::foods::{FoodCreateDBRequest, FoodDBResponse, FoodFilter, FoodUpdateDBRequest};
use crate::errors::Error;
use crate::types::{CountryId, FoodId, TasteId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountryResponse {
    pub id: CountryId,
    pub country_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Country> for CountryResponse {
    fn from(c: Country) -> Self {
        Self {
            id: c.id,
            country_name: c.country_name,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TasteResponse {
    pub id: TasteId,
    pub taste: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Taste> for TasteResponse {
    fn from(t: Taste) -> Self {
        Self {
            id: t.id,
            taste: t.taste,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FoodResponse {
    pub id: FoodId,
    pub known_as: String,
    pub slug: String,
    pub description: String,
    pub make_year: i32,
    pub country_id: Option<CountryId>,
    pub country: Option<CountryResponse>,
    pub tastes: Vec<TasteResponse>,
    pub taste_ids: Vec<TasteId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FoodDBResponse> for FoodResponse {
    fn from(db: FoodDBResponse) -> Self {
        let taste_ids = db.taste_ids();
        Self {
            id: db.id,
            known_as: db.known_as,
            slug: db.slug,
            description: db.description,
            make_year: db.make_year,
            country_id: db.country_id,
            country: db.country.map(Into::into),
            tastes: db.tastes.into_iter().map(Into::into).collect(),
            taste_ids,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// `data` of the food listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FoodsList {
    pub foods: Vec<FoodResponse>,
}

/// Insert-or-update payload for `/admin/foods/save`. `id` of 0 (or absent) inserts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FoodSave {
    #[serde(default)]
    pub id: FoodId,
    pub known_as: String,
    pub country_id: Option<CountryId>,
    #[serde(default)]
    pub make_year: i32,
    #[serde(default)]
    pub description: String,
    /// Optional base64 (standard alphabet) JPEG, stored as `/static/samples/<slug>.jpg`
    #[serde(default)]
    pub sample: String,
    #[serde(default)]
    pub taste_ids: Vec<TasteId>,
}

impl FoodSave {
    pub fn create_request(&self) -> FoodCreateDBRequest {
        FoodCreateDBRequest {
            known_as: self.known_as.trim().to_string(),
            country_id: self.country_id,
            make_year: self.make_year,
            description: self.description.clone(),
            taste_ids: self.taste_ids.clone(),
        }
    }

    pub fn update_request(&self) -> FoodUpdateDBRequest {
        FoodUpdateDBRequest {
            known_as: self.known_as.trim().to_string(),
            country_id: self.country_id,
            make_year: self.make_year,
            description: self.description.clone(),
            taste_ids: self.taste_ids.clone(),
        }
    }
}

/// `{ value, text }` pairs for select boxes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectOption {
    pub value: i32,
    pub text: String,
}

impl From<Country> for SelectOption {
    fn from(c: Country) -> Self {
        Self {
            value: c.id,
            text: c.country_name,
        }
    }
}

impl From<Taste> for SelectOption {
    fn from(t: Taste) -> Self {
        Self { value: t.id, text: t.taste }
    }
}

/// Optional pagination for the public food listing. Both must be given to paginate.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct FoodsQuery {
    /// 1-based page number
    #[param(minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<i64>,

    /// Foods per page
    #[param(minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl FoodsQuery {
    pub fn filter(&self) -> Result<FoodFilter, Error> {
        match (self.page, self.page_size) {
            (None, None) => Ok(FoodFilter::all()),
            (Some(page), Some(page_size)) => FoodFilter::page(page, page_size),
            _ => Err(Error::BadRequest {
                message: "page and page_size must be given together".to_string(),
            }),
        }
    }
}
