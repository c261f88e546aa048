//! Restaurant Stock Management Platform - Backend Server
//!
//! Tenant-scoped API over stock lots, menu recipes and the derived stock
//! alert feed.

use std::{sync::Arc, time::Duration};

use axum::{routing::get, Router};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod error;
mod handlers;
mod middleware;
mod routes;
mod services;

pub use config::Config;

const DEFAULT_LOG_FILTER: &str = "stock_server=debug,tower_http=debug,sqlx=warn";

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::load()?);

    tracing::info!(environment = %config.environment, "Starting stock server");

    let db = connect(&config).await?;
    if config.environment == "development" {
        sqlx::migrate!("./migrations").run(&db).await?;
        tracing::info!("Schema is up to date");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_app(AppState { db, config });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!(
        max_connections = config.database.max_connections,
        "Database pool ready"
    );
    Ok(pool)
}

/// Router with every route and the shared layers
fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Restaurant Stock Management API v1" }))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
