//! Test utilities shared by the unit and integration tests.

use crate::auth::password::Argon2Params;
use crate::config::{Config, PoolSettings};
use crate::db::{
    handlers::{Repository, Users},
    models::users::{UserCreateDBRequest, UserDBResponse},
};
use crate::{AppState, BackgroundServices};
use axum_test::TestServer;
use sqlx::PgPool;

pub async fn create_test_app(pool: PgPool) -> (TestServer, BackgroundServices) {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> (TestServer, BackgroundServices) {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    // Samples written by tests land in a per-process temp directory
    let static_dir = std::env::temp_dir().join(format!("foodapi-test-static-{}", std::process::id()));

    let mut config = Config {
        static_dir,
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 4,
        min_connections: 0,
        ..Default::default()
    };
    config.port = 0;
    config.admin_password = None;

    let params = fast_argon2_params();
    config.auth.password.argon2_memory_kib = params.memory_kib;
    config.auth.password.argon2_iterations = params.iterations;
    config.auth.password.argon2_parallelism = params.parallelism;

    config
}

/// Minimal Argon2 cost so hashing does not dominate test time
pub fn fast_argon2_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 128,
        iterations: 1,
        parallelism: 1,
    }
}

pub async fn create_test_app_state(pool: PgPool, config: Config) -> AppState {
    crate::migrator().run(&pool).await.expect("Failed to run migrations");
    AppState::builder().db(pool).config(config).build()
}

/// Create an active user with the given credentials
pub async fn create_test_user(pool: &PgPool, email: &str, password: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let (first_name, _) = email.split_once('@').unwrap_or((email, ""));

    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            password: password.to_string(),
            active: true,
            argon2_params: fast_argon2_params(),
        })
        .await
        .expect("Failed to create test user")
}

/// Log in through the API and return the plaintext bearer token
pub async fn login_token(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/users/login")
        .json(&serde_json::json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["data"]["token"]["token"]
        .as_str()
        .expect("login response carries a token")
        .to_string()
}

/// Make every insert into `foods_tastes` fail until [`thaw_taste_links`] is called
pub async fn freeze_taste_links(pool: &PgPool) {
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION reject_taste_links() RETURNS trigger AS $$
        BEGIN
            RAISE EXCEPTION 'taste links are frozen';
        END
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(pool)
    .await
    .expect("Failed to create trigger function");

    sqlx::query("CREATE TRIGGER freeze_taste_links BEFORE INSERT ON foods_tastes FOR EACH ROW EXECUTE FUNCTION reject_taste_links()")
        .execute(pool)
        .await
        .expect("Failed to create trigger");
}

pub async fn thaw_taste_links(pool: &PgPool) {
    sqlx::query("DROP TRIGGER freeze_taste_links ON foods_tastes")
        .execute(pool)
        .await
        .expect("Failed to drop trigger");
}
