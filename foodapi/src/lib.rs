//! # foodapi: Food catalog backend
//!
//! `foodapi` serves a catalog of foods, each with a country of origin and a set of tastes, over a
//! JSON REST API. Anyone can browse the catalog; curating it (editing foods, managing the users
//! who curate) requires a bearer token obtained by logging in.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence.
//!
//! ### Request Flow
//!
//! Public requests (`/foods`, `/foods/{slug}`, login and logout) go straight to their handler.
//! Requests under `/admin` first pass through [`auth::middleware`], which resolves the
//! `Authorization: Bearer <token>` header to an active user or rejects the request with 401
//! before any handler runs. Handlers talk to the database through repositories in
//! [`db::handlers`], each constructed per request over a connection borrowed from the pool.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) holds the route handlers and the request/response models. Every
//! response is wrapped in the `{error, message, data}` envelope.
//!
//! The **authentication layer** ([`auth`]) issues opaque random tokens, stores only their
//! SHA-256, and hashes passwords with Argon2.
//!
//! The **database layer** ([`db`]) uses the repository pattern. Every query is bounded by the
//! configured `query_timeout`. A food's tastes are kept in a join table and replaced wholesale on
//! each save.
//!
//! A **background task** ([`cleanup`]) optionally sweeps expired tokens.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use foodapi::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = foodapi::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     foodapi::telemetry::init_telemetry(config.log_format)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations run automatically on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! foodapi::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod slug;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::password::Argon2Params,
    config::CorsOrigin,
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    openapi::ApiDoc,
};
use auth::middleware::require_bearer_middleware;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{CountryId, FoodId, TasteId, TokenId, UserId};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `db`: PostgreSQL connection pool; repositories borrow a connection per operation
/// - `config`: Application configuration loaded from file and environment
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the foodapi database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user, or refresh it if it already exists.
///
/// With a password, a missing user is created active and an existing user gets the password
/// reset and is reactivated. Without a password an existing user is left alone and a missing one
/// cannot be created, since every account needs a password.
///
/// # Returns
///
/// The admin user's id, or `None` if there is no admin user and no password to create one with.
#[instrument(skip_all, fields(email = %email))]
pub async fn create_initial_admin_user(
    email: &str,
    password: Option<&str>,
    params: Argon2Params,
    db: &PgPool,
) -> db::errors::Result<Option<UserId>> {
    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        if let Some(password) = password {
            user_repo.reset_password(existing_user.id, password, params).await?;
            user_repo.set_active(existing_user.id, true).await?;
            info!(user_id = existing_user.id, "Refreshed initial admin user");
        }
        tx.commit().await?;
        return Ok(Some(existing_user.id));
    }

    let Some(password) = password else {
        warn!("No admin user exists and no admin_password is configured; nobody can log in yet");
        return Ok(None);
    };

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            password: password.to_string(),
            active: true,
            argon2_params: params,
        })
        .await?;

    tx.commit().await?;
    info!(user_id = created_user.id, "Created initial admin user");
    Ok(Some(created_user.id))
}

/// Connect the pool, run migrations, and make sure the admin user exists
async fn setup_database(config: &Config, pool: Option<PgPool>) -> anyhow::Result<PgPool> {
    let pool = match pool {
        Some(pool) => pool,
        None => {
            let settings = &config.database.pool;
            let seconds = |s: u64| (s > 0).then(|| Duration::from_secs(s));
            PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .min_connections(settings.min_connections)
                .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
                .idle_timeout(seconds(settings.idle_timeout_secs))
                .max_lifetime(seconds(settings.max_lifetime_secs))
                .connect(&config.database.url)
                .await?
        }
    };

    migrator().run(&pool).await?;

    create_initial_admin_user(
        &config.admin_email,
        config.admin_password.as_deref(),
        Argon2Params::from(&config.auth.password),
        &pool,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.cors;

    let has_wildcard = cors_config
        .allowed_origins
        .iter()
        .any(|origin| matches!(origin, CorsOrigin::Wildcard));

    let allow_origin = if has_wildcard {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Public routes (login, logout, token validation, food browsing)
/// - Admin routes behind the bearer-token middleware
/// - Static file serving for food samples
/// - OpenAPI docs at `/docs`
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let public_routes = Router::new()
        .route("/users/login", post(api::handlers::auth::login))
        .route("/users/logout", post(api::handlers::auth::logout))
        .route("/validate-token", post(api::handlers::auth::validate_token))
        .route("/foods", get(api::handlers::foods::list_foods))
        .route("/foods/{slug}", get(api::handlers::foods::get_food_by_slug));

    let admin_routes = Router::new()
        // User management
        .route("/users", get(api::handlers::users::list_users))
        .route("/users/save", post(api::handlers::users::save_user))
        .route("/users/get/{id}", get(api::handlers::users::get_user))
        .route("/users/delete", post(api::handlers::users::delete_user))
        .route("/log-user-out/{id}", post(api::handlers::users::log_user_out))
        // Select options
        .route("/countries/all", get(api::handlers::catalog::all_countries))
        .route("/tastes/all", get(api::handlers::catalog::all_tastes))
        // Food editing
        .route("/foods/save", post(api::handlers::foods::save_food))
        .route("/foods/delete", post(api::handlers::foods::delete_food))
        .route("/foods/{id}", get(api::handlers::foods::get_food_by_id))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_middleware));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(public_routes)
        .nest("/admin", admin_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state.clone())
        .nest_service("/static", ServeDir::new(&state.config.static_dir));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Container for background services and their lifecycle management.
///
/// When dropped, the `drop_guard` cancels the shutdown token, signaling all tasks to stop.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Start the optional token cleanup task
fn setup_background_services(pool: PgPool, config: &Config, shutdown_token: tokio_util::sync::CancellationToken) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    match config.auth.tokens.cleanup_interval {
        Some(interval) => {
            let handle = tokio::spawn(cleanup::run_token_cleanup(
                pool,
                interval,
                config.query_timeout,
                shutdown_token.clone(),
            ));
            background_tasks.push(handle);
        }
        None => debug!("Token cleanup disabled; expired tokens are pruned at login"),
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations, ensures the
///    admin user and starts background services
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, stops background tasks and closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// As [`Application::new`], reusing an existing pool if one is given
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting foodapi with configuration: {:#?}", config);

        let pool = setup_database(&config, pool).await?;

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(pool.clone(), &config, shutdown_token);

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "foodapi listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Shutdown background services and wait for tasks to complete
        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{create_initial_admin_user, create_cors_layer};
    use crate::{
        config::CorsOrigin,
        db::handlers::{Repository, Users},
        test_utils::{create_test_app, create_test_config, fast_argon2_params},
    };
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_new_user(pool: PgPool) {
        let id = create_initial_admin_user("root@example.com", Some("rootpassword"), fast_argon2_params(), &pool)
            .await
            .unwrap()
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.email, "root@example.com");
        assert!(user.active);
        assert!(user.password_matches("rootpassword").unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_refreshes_existing(pool: PgPool) {
        let first = create_initial_admin_user("root@example.com", Some("rootpassword"), fast_argon2_params(), &pool)
            .await
            .unwrap()
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn).set_active(first, false).await.unwrap();
        drop(conn);

        let second = create_initial_admin_user("root@example.com", Some("newpassword"), fast_argon2_params(), &pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(first).await.unwrap().unwrap();
        assert!(user.active);
        assert!(user.password_matches("newpassword").unwrap());
        assert!(!user.password_matches("rootpassword").unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_without_password(pool: PgPool) {
        let id = create_initial_admin_user("root@example.com", None, fast_argon2_params(), &pool)
            .await
            .unwrap();
        assert!(id.is_none());

        let mut conn = pool.acquire().await.unwrap();
        assert!(Users::new(&mut conn).get_user_by_email("root@example.com").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz_and_docs(pool: PgPool) {
        let (server, _bg) = create_test_app(pool).await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");

        server.get("/docs").await.assert_status_ok();
        server.get("/no-such-route").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_layer_accepts_wildcard_and_urls() {
        let mut config = create_test_config();
        config.auth.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        assert!(create_cors_layer(&config).is_ok());

        config.auth.cors.allowed_origins = vec![
            CorsOrigin::Url("https://admin.example.com".parse().unwrap()),
            CorsOrigin::Url("http://localhost:5173".parse().unwrap()),
        ];
        config.auth.cors.allow_credentials = true;
        assert!(create_cors_layer(&config).is_ok());
    }
}
