//! PDF Burn Server
//!
//! Accepts a PDF, an optional list of pages to keep and a set of full-page
//! PNG overlays, and returns the pruned PDF with the overlays burned in.
//!
//! - `GET /api/health`: liveness probe
//! - `POST /api/burn`: multipart `pdf`, `overlays`, `keep`

use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod error;
mod request;

use api::{handle_burn, handle_health};
use config::{Args, ServerConfig};

/// Build the router with every route and middleware layer
pub(crate) fn build_router(config: &ServerConfig) -> anyhow::Result<Router> {
    let cors = config.cors_layer()?;

    Ok(Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/burn", post(handle_burn))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from(&args);
    let app = build_router(&config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Allowed origins: {}", config.allowed_origins.join(", "));
    info!("Upload limit: {} MB", args.max_upload_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
