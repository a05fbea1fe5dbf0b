//! OpenAPI documentation, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Security scheme for the admin routes (session bearer token).
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("Session token")
                        .description(Some(
                            "Session token authentication. Log in at `/users/login` and send the returned token:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Food catalog API", description = "Foods, their tastes and countries, and the users who curate them."),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::validate_token,
        api::handlers::foods::list_foods,
        api::handlers::foods::get_food_by_slug,
        api::handlers::foods::get_food_by_id,
        api::handlers::foods::save_food,
        api::handlers::foods::delete_food,
        api::handlers::catalog::all_countries,
        api::handlers::catalog::all_tastes,
        api::handlers::users::list_users,
        api::handlers::users::save_user,
        api::handlers::users::get_user,
        api::handlers::users::delete_user,
        api::handlers::users::log_user_out,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::LoginResponse,
            api::models::auth::TokenRequest,
            api::models::auth::TokenResponse,
            api::models::users::UserResponse,
            api::models::users::UserSave,
            api::models::users::UsersList,
            api::models::users::IdRequest,
            api::models::foods::FoodResponse,
            api::models::foods::FoodSave,
            api::models::foods::FoodsList,
            api::models::foods::CountryResponse,
            api::models::foods::TasteResponse,
            api::models::foods::SelectOption,
        )
    ),
    tags(
        (name = "authentication", description = "Login, logout and token validation"),
        (name = "foods", description = "Food catalog"),
        (name = "catalog", description = "Country and taste vocabularies"),
        (name = "users", description = "User administration"),
    )
)]
pub struct ApiDoc;
