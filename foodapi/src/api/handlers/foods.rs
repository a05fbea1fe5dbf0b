use std::path::Path as FsPath;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use base64::{Engine as _, engine::general_purpose};

use crate::{
    AppState,
    api::models::{
        envelope::ApiResponse,
        foods::{FoodResponse, FoodSave, FoodsList, FoodsQuery},
        users::{CurrentUser, IdRequest},
    },
    db::handlers::{Foods, Repository},
    errors::Error,
    slug::slugify,
    types::FoodId,
};

/// Decode a base64 sample and write it to `<samples_dir>/<slug>.jpg`, replacing any previous one.
#[tracing::instrument(skip(encoded, samples_dir), fields(bytes = encoded.len()))]
async fn store_sample(samples_dir: &FsPath, slug: &str, encoded: &str) -> Result<(), Error> {
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).map_err(|e| Error::BadRequest {
        message: format!("sample is not valid base64: {e}"),
    })?;

    tokio::fs::create_dir_all(samples_dir).await.map_err(|e| Error::Internal {
        operation: format!("create samples directory: {e}"),
    })?;

    let path = samples_dir.join(format!("{slug}.jpg"));
    tokio::fs::write(&path, decoded).await.map_err(|e| Error::Internal {
        operation: format!("write sample {}: {e}", path.display()),
    })?;

    tracing::debug!(path = %path.display(), "stored food sample");
    Ok(())
}

/// List foods, optionally one page at a time
#[utoipa::path(
    get,
    path = "/foods",
    tag = "foods",
    params(FoodsQuery),
    responses(
        (status = 200, description = "Foods ordered by name", body = ApiResponse<FoodsList>),
        (status = 400, description = "Invalid pagination"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_foods(State(state): State<AppState>, Query(query): Query<FoodsQuery>) -> Result<Json<ApiResponse<FoodsList>>, Error> {
    let filter = query.filter()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let foods = Foods::new(&mut conn).with_timeout(state.config.query_timeout).list(&filter).await?;

    Ok(Json(ApiResponse::ok(
        "success",
        FoodsList {
            foods: foods.into_iter().map(FoodResponse::from).collect(),
        },
    )))
}

/// Get one food by slug
#[utoipa::path(
    get,
    path = "/foods/{slug}",
    tag = "foods",
    params(("slug" = String, Path, description = "Food slug")),
    responses(
        (status = 200, description = "The food", body = ApiResponse<FoodResponse>),
        (status = 404, description = "Food not found"),
    )
)]
#[tracing::instrument(skip_all, fields(slug = %slug))]
pub async fn get_food_by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<ApiResponse<FoodResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let food = Foods::new(&mut conn)
        .with_timeout(state.config.query_timeout)
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Food".to_string(),
            id: slug.clone(),
        })?;

    Ok(Json(ApiResponse::ok("", FoodResponse::from(food))))
}

/// Get one food by id
#[utoipa::path(
    get,
    path = "/admin/foods/{id}",
    tag = "foods",
    params(("id" = i32, Path, description = "Food ID")),
    responses(
        (status = 200, description = "The food", body = ApiResponse<FoodResponse>),
        (status = 404, description = "Food not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(food_id = id))]
pub async fn get_food_by_id(
    State(state): State<AppState>,
    Path(id): Path<FoodId>,
    _current_user: CurrentUser,
) -> Result<Json<ApiResponse<FoodResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let food = Foods::new(&mut conn)
        .with_timeout(state.config.query_timeout)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Food".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(ApiResponse::ok("", FoodResponse::from(food))))
}

/// Insert a food (id 0) or update an existing one, replacing its taste set
///
/// A sample, if given, is written before anything touches the database; failing to write it
/// fails the whole request.
#[utoipa::path(
    post,
    path = "/admin/foods/save",
    request_body = FoodSave,
    tag = "foods",
    responses(
        (status = 202, description = "Changes saved"),
        (status = 400, description = "Invalid input, unknown country or taste"),
        (status = 404, description = "Food not found"),
        (status = 409, description = "Another food already uses this name"),
        (status = 500, description = "Food saved, but its tastes were not"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(food_id = request.id))]
pub async fn save_food(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<FoodSave>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Error> {
    let known_as = request.known_as.trim();
    if known_as.is_empty() {
        return Err(Error::BadRequest {
            message: "known_as is required".to_string(),
        });
    }
    let slug = slugify(known_as);
    if slug.is_empty() {
        return Err(Error::BadRequest {
            message: "known_as must contain at least one letter or digit".to_string(),
        });
    }

    if !request.sample.is_empty() {
        store_sample(&state.config.samples_dir(), &slug, &request.sample).await?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut foods = Foods::new(&mut conn).with_timeout(state.config.query_timeout);

    let saved = if request.id == 0 {
        foods.create(&request.create_request()).await?
    } else {
        foods.update(request.id, &request.update_request()).await?
    };
    tracing::info!(food_id = saved.id, slug = %saved.slug, by = current_user.id, "food saved");

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::message("Changes saved"))))
}

/// Delete a food and its taste associations
#[utoipa::path(
    post,
    path = "/admin/foods/delete",
    request_body = IdRequest,
    tag = "foods",
    responses(
        (status = 200, description = "Food deleted"),
        (status = 404, description = "Food not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(food_id = request.id))]
pub async fn delete_food(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<IdRequest>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Foods::new(&mut conn).with_timeout(state.config.query_timeout).delete(request.id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Food".to_string(),
            id: request.id.to_string(),
        });
    }

    tracing::info!(food_id = request.id, by = current_user.id, "food deleted");
    Ok(Json(ApiResponse::message("Food deleted")))
}

#[cfg(test)]
mod tests {
    use super::store_sample;
    use crate::{
        api::models::{
            envelope::ApiResponse,
            foods::{FoodResponse, FoodsList},
        },
        db::handlers::Countries,
        test_utils::{
            create_test_app, create_test_app_with_config, create_test_config, create_test_user, freeze_taste_links, login_token,
            thaw_taste_links,
        },
    };
    use axum::http::StatusCode;
    use base64::{Engine as _, engine::general_purpose};
    use serde_json::json;
    use sqlx::PgPool;

    async fn seed_country(pool: &PgPool, name: &str) -> i32 {
        let mut conn = pool.acquire().await.unwrap();
        Countries::new(&mut conn).create(name).await.unwrap().id
    }

    #[tokio::test]
    async fn test_store_sample_writes_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples");
        let encoded = general_purpose::STANDARD.encode(b"\xff\xd8\xff fake jpeg");

        store_sample(&samples, "hamburger", &encoded).await.unwrap();

        let written = std::fs::read(samples.join("hamburger.jpg")).unwrap();
        assert_eq!(written, b"\xff\xd8\xff fake jpeg");
    }

    #[tokio::test]
    async fn test_store_sample_rejects_bad_base64() {
        let dir = tempfile::tempdir().unwrap();

        let err = store_sample(dir.path(), "hamburger", "!!not base64!!").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!dir.path().join("hamburger.jpg").exists());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_hamburger_round_trip(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let usa = seed_country(&pool, "United States").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        let response = server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Hamburger", "country_id": usa, "taste_ids": [3] }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        let body: ApiResponse<()> = response.json();
        assert_eq!(body.message, "Changes saved");

        let body: ApiResponse<FoodResponse> = server.get("/foods/hamburger").await.json();
        let food = body.data.unwrap();
        assert_eq!(food.slug, "hamburger");
        assert_eq!(food.taste_ids, vec![3]);
        assert_eq!(food.tastes[0].taste, "sour");
        assert_eq!(food.country.as_ref().unwrap().country_name, "United States");

        // Lookup by id agrees with lookup by slug
        let by_id: ApiResponse<FoodResponse> = server
            .get(&format!("/admin/foods/{}", food.id))
            .authorization_bearer(&token)
            .await
            .json();
        let by_id = by_id.data.unwrap();
        assert_eq!(by_id.slug, food.slug);
        assert_eq!(by_id.taste_ids, food.taste_ids);

        // Clearing the taste set
        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "id": food.id, "known_as": "Hamburger", "country_id": usa, "taste_ids": [] }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let body: ApiResponse<FoodResponse> = server.get("/foods/hamburger").await.json();
        assert!(body.data.unwrap().tastes.is_empty());

        let response = server.get("/foods/bad-slug").await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: ApiResponse<()> = response.json();
        assert!(body.error);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_foods_and_pagination(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        for name in ["Pho", "Arepa", "Goulash"] {
            server
                .post("/admin/foods/save")
                .authorization_bearer(&token)
                .json(&json!({ "known_as": name, "country_id": null, "taste_ids": [1] }))
                .await
                .assert_status(StatusCode::ACCEPTED);
        }

        let body: ApiResponse<FoodsList> = server.get("/foods").await.json();
        let names: Vec<_> = body.data.unwrap().foods.into_iter().map(|f| f.known_as).collect();
        assert_eq!(names, vec!["Arepa", "Goulash", "Pho"]);

        let body: ApiResponse<FoodsList> = server.get("/foods?page=2&page_size=2").await.json();
        let names: Vec<_> = body.data.unwrap().foods.into_iter().map(|f| f.known_as).collect();
        assert_eq!(names, vec!["Pho"]);

        server.get("/foods?page=0&page_size=2").await.assert_status(StatusCode::BAD_REQUEST);
        server.get("/foods?page=1").await.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_save_food_rejections(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        server
            .post("/admin/foods/save")
            .json(&json!({ "known_as": "Hamburger", "taste_ids": [3] }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "  ", "taste_ids": [] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Hamburger", "taste_ids": [999] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Hamburger", "country_id": 999, "taste_ids": [] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "id": 4242, "known_as": "Ghost", "taste_ids": [] }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Hamburger", "taste_ids": [] }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "hamburger!", "taste_ids": [] }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_save_food_writes_sample(pool: PgPool) {
        let static_dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.static_dir = static_dir.path().to_path_buf();

        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app_with_config(pool, config).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        let sample = general_purpose::STANDARD.encode(b"jpeg bytes");
        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Crème Brûlée", "taste_ids": [2], "sample": sample }))
            .await
            .assert_status(StatusCode::ACCEPTED);

        let written = std::fs::read(static_dir.path().join("samples").join("creme-brulee.jpg")).unwrap();
        assert_eq!(written, b"jpeg bytes");

        server.get("/static/samples/creme-brulee.jpg").await.assert_status_ok();

        // A broken sample fails the edit before the database is touched
        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Flan", "taste_ids": [2], "sample": "%%%" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server.get("/foods/flan").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_latin_names_get_distinct_slugs(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        for name in ["Sushi", "Sushi 寿司", "寿司"] {
            server
                .post("/admin/foods/save")
                .authorization_bearer(&token)
                .json(&json!({ "known_as": name, "taste_ids": [1] }))
                .await
                .assert_status(StatusCode::ACCEPTED);
        }

        let body: ApiResponse<FoodsList> = server.get("/foods").await.json();
        let foods = body.data.unwrap().foods;
        assert_eq!(foods.len(), 3);
        for food in &foods {
            assert!(!food.slug.is_empty());
            let body: ApiResponse<FoodResponse> = server.get(&format!("/foods/{}", food.slug)).await.json();
            assert_eq!(body.data.unwrap().known_as, food.known_as);
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_save_reports_food_saved_without_tastes(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool.clone()).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        freeze_taste_links(&pool).await;
        let response = server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Goulash", "taste_ids": [3, 5] }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ApiResponse<()> = response.json();
        assert!(body.error);
        assert_eq!(body.message, "food saved, but tastes not");

        let body: ApiResponse<FoodResponse> = server.get("/foods/goulash").await.json();
        let food = body.data.unwrap();
        assert!(food.taste_ids.is_empty());

        // Saving again once the store recovers completes the association
        thaw_taste_links(&pool).await;
        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "id": food.id, "known_as": "Goulash", "taste_ids": [3, 5] }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let body: ApiResponse<FoodResponse> = server.get("/foods/goulash").await.json();
        let mut taste_ids = body.data.unwrap().taste_ids;
        taste_ids.sort();
        assert_eq!(taste_ids, vec![3, 5]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_food(pool: PgPool) {
        create_test_user(&pool, "admin@example.com", "verysecret").await;
        let (server, _bg) = create_test_app(pool).await;
        let token = login_token(&server, "admin@example.com", "verysecret").await;

        server
            .post("/admin/foods/save")
            .authorization_bearer(&token)
            .json(&json!({ "known_as": "Pierogi", "taste_ids": [4, 6] }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let body: ApiResponse<FoodResponse> = server.get("/foods/pierogi").await.json();
        let id = body.data.unwrap().id;

        let response = server
            .post("/admin/foods/delete")
            .authorization_bearer(&token)
            .json(&json!({ "id": id }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<()> = response.json();
        assert_eq!(body.message, "Food deleted");

        server.get("/foods/pierogi").await.assert_status(StatusCode::NOT_FOUND);
        server
            .post("/admin/foods/delete")
            .authorization_bearer(&token)
            .json(&json!({ "id": id }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
