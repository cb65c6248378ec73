//! Startup configuration
//!
//! Everything here is read once in `main` and never changes afterwards.

use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 100;
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:5500"];

/// Command-line arguments for the burn server
#[derive(Parser, Debug)]
#[command(name = "pdfburn-api")]
#[command(about = "Prune PDF pages and burn raster overlays onto them")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PDFBURN_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "PDFBURN_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Origins allowed to call the API; `*` allows any origin
    #[arg(
        long = "allow-origin",
        env = "PDFBURN_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = DEFAULT_ALLOWED_ORIGINS
    )]
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in megabytes
    #[arg(long, env = "PDFBURN_MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            allowed_origins: args
                .allowed_origins
                .iter()
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

impl ServerConfig {
    /// Build the CORS layer for the configured origins
    ///
    /// Browsers refuse credentials with a wildcard origin, so `*` switches to
    /// an anonymous policy.
    pub fn cors_layer(&self) -> anyhow::Result<CorsLayer> {
        if self.allowed_origins.iter().any(|origin| origin == "*") {
            return Ok(CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any));
        }

        let origins = self
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid CORS origin: {:?}", origin))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()))
    }
}
