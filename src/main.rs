//! Designer Directory Backend
//!
//! Serves a directory of designers read from a spreadsheet, with facet filtering.

mod api;
mod config;
mod directory;
mod errors;
mod fetch;
mod filter;
mod models;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use directory::DirectoryCache;
use fetch::DirectoryFetcher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<DirectoryCache>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Designer Directory Backend");
    tracing::info!("Source: {}", config.source.kind.as_str());
    tracing::info!("Revalidate after: {:?}", config.revalidate);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Surface a missing sheet id or credential now rather than on the first request
    if let Err(e) = config.source.descriptor() {
        tracing::error!("Directory source is not usable: {}", e);
    }

    let fetcher = DirectoryFetcher::new(reqwest::Client::new(), config.source.clone());
    let directory = Arc::new(DirectoryCache::new(
        fetcher,
        config.display_order,
        config.revalidate,
    ));

    // Warm the snapshot; failures are served as errors until a refresh succeeds
    let snapshot = directory.refresh().await;
    if let Ok(loaded) = &snapshot.outcome {
        tracing::info!("Directory loaded with {} designers", loaded.designers.len());
    }

    let state = AppState { directory };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Designers
        .route("/designers", get(api::list_designers))
        // Directory
        .route("/directory", get(api::get_directory))
        .route("/directory/revision", get(api::get_revision))
        // Facets
        .route("/facets", get(api::list_facets))
        // Filtering
        .route("/filter", post(api::apply_filter))
        .route("/filter/toggle", post(api::toggle_filter))
        .route("/filter/clear", post(api::clear_filter));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
