//! # FuelTrackr Server
//!
//! HTTP API for a small travel/fuel expense tracker, built with Axum and Tokio.
//! Employees register, log in and record the kilometers they drive; admins
//! review all logs and manage user accounts.
//!
//! ## Architecture
//! - `config`: environment configuration, loaded once at startup
//! - `auth`: password hashing, access tokens, auth middleware and role guard
//! - `database`: user and travel-log stores (PostgreSQL or in-memory)
//! - `routes`: HTTP handlers for users, admin and travel logs
//! - `server`: router assembly and server lifecycle
//!
//! ## Running the Server
//! ```bash
//! JWT_SECRET=change-me DATABASE_URL=postgres://user:pw@localhost/fueltrackr cargo run
//! ```
//!
//! Without `DATABASE_URL` the server runs against an in-memory store.
//! The server listens on `http://0.0.0.0:8000` by default.

mod auth;
mod config;
mod database;
mod error;
mod routes;
mod server;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables take precedence
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!("Starting FuelTrackr Server...");
    tracing::info!("Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!("Build profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });

    let config = config::Config::from_env()?;
    server::start(config).await
}
