//! # Server Module
//!
//! HTTP server setup and route configuration for the FuelTrackr server.

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthMiddleware, JwtService, Role, RoleGuard};
use crate::config::{Config, ServerConfig};
use crate::database::{DatabaseConnection, MemoryStore, TravelStore, UserStore, migrations};
use crate::routes::{auth, health, travels, users};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub jwt_service: Arc<JwtService>,
    pub users: Arc<dyn UserStore>,
    pub travels: Arc<dyn TravelStore>,
}

impl AppState {
    /// State backed by a fresh in-memory store.
    pub fn in_memory(jwt_service: Arc<JwtService>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            jwt_service,
            users: store.clone(),
            travels: store,
        }
    }

    /// Connect the configured backend: PostgreSQL when a database URL is set,
    /// otherwise an in-memory store.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let jwt_service = Arc::new(JwtService::new(&config.jwt));

        let Some(database) = &config.database else {
            tracing::warn!("DATABASE_URL is not set, using the in-memory store; data is lost on restart");
            return Ok(Self::in_memory(jwt_service));
        };

        let db = DatabaseConnection::from_url(&database.url, database.max_connections)
            .await
            .context("Failed to connect to the database")?;
        migrations::run_migrations(db.pool()).await?;

        let db = Arc::new(db);
        Ok(Self {
            jwt_service,
            users: db.clone(),
            travels: db,
        })
    }
}

/// Build the application router.
///
/// Three groups share one state: public routes, routes that need any valid
/// token, and admin-only routes guarded by an exact role match.
pub fn build_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health::root))
        .route("/ping", get(health::ping))
        .route("/api/users/register", post(auth::register))
        .route("/api/users/login", post(auth::login));

    let authenticated_routes = Router::new()
        .route("/api/users/me", get(users::me).put(users::update_me))
        .route(
            "/api/travels",
            post(travels::add_travel).get(travels::my_travels),
        )
        .route(
            "/api/travels/",
            post(travels::add_travel).get(travels::my_travels),
        )
        .route("/api/travels/me", get(travels::my_travels))
        .route_layer(middleware::from_fn_with_state(
            app_state.jwt_service.clone(),
            AuthMiddleware::validate_token,
        ));

    let admin_routes = Router::new()
        .route("/api/users/all", get(users::list_users))
        .route(
            "/api/users/{email}",
            put(users::admin_update_user).delete(users::delete_user),
        )
        .route("/api/admin/travels", get(travels::all_travels))
        .route("/api/admin/users/{email}/travels", get(travels::user_travels))
        .route_layer(middleware::from_fn_with_state(
            RoleGuard::require(app_state.jwt_service.clone(), Role::Admin),
            RoleGuard::enforce,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .with_state(app_state)
}

fn cors_layer(server: &ServerConfig) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ]);

    if server.allowed_origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }
    let origins = server
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin {origin:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(cors.allow_origin(origins))
}

/// Starts the FuelTrackr HTTP server and serves until the process is stopped.
pub async fn start(config: Config) -> Result<()> {
    let app_state = AppState::from_config(&config).await?;

    let app = build_router(app_state)
        .layer(cors_layer(&config.server)?)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/ping", addr);
    tracing::info!("Access tokens: {:?}, ttl {} min", config.jwt.algorithm, config.jwt.ttl.num_minutes());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
