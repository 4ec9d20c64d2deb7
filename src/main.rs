mod config;
mod db;
mod domain;
mod services;
mod state;
mod web;

use crate::config::{AppConfig, CorsPolicy};
use crate::db::PgStore;
use crate::state::{AppState, SharedState};
use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    let shared: SharedState = Arc::new(AppState::new(Arc::new(PgStore::new(pool))));

    let app = web::routes(shared).layer(TraceLayer::new_for_http());
    let app = match cors_layer(&config.cors) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(policy: &CorsPolicy) -> Option<CorsLayer> {
    match policy {
        CorsPolicy::Disabled => None,
        CorsPolicy::AnyOrigin => Some(CorsLayer::permissive()),
        CorsPolicy::Origins(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            Some(
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(allowed))
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        }
    }
}
