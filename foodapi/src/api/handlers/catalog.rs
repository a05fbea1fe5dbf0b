use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{envelope::ApiResponse, foods::SelectOption, users::CurrentUser},
    db::handlers::{Countries, Tastes},
    errors::Error,
};

/// All countries as select options, ordered by name
#[utoipa::path(
    get,
    path = "/admin/countries/all",
    tag = "catalog",
    responses(
        (status = 200, description = "Countries as {value, text} pairs", body = ApiResponse<Vec<SelectOption>>),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn all_countries(State(state): State<AppState>, _current_user: CurrentUser) -> Result<Json<ApiResponse<Vec<SelectOption>>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let countries = Countries::new(&mut conn).with_timeout(state.config.query_timeout).all().await?;

    Ok(Json(ApiResponse::ok("", countries.into_iter().map(SelectOption::from).collect())))
}

/// All tastes as select options, ordered by label
#[utoipa::path(
    get,
    path = "/admin/tastes/all",
    tag = "catalog",
    responses(
        (status = 200, description = "Tastes as {value, text} pairs", body = ApiResponse<Vec<SelectOption>>),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn all_tastes(State(state): State<AppState>, _current_user: CurrentUser) -> Result<Json<ApiResponse<Vec<SelectOption>>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let tastes = Tastes::new(&mut conn).with_timeout(state.config.query_timeout).all().await?;

    Ok(Json(ApiResponse::ok("", tastes.into_iter().map(SelectOption::from).collect())))
}
