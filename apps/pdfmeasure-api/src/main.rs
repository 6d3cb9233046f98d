//! PDF Measure API Server
//!
//! Holds one uploaded PDF at a time and answers questions about it:
//!
//! - `POST /upload`: make a PDF the current document
//! - `GET /dimensions/:page_num`: page width and height in points
//! - `POST /measure`: width, height and diagonal between two points
//! - `GET /table-of-contents`: TOC entries
//! - `GET /document`: metadata of the current document

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod handlers;
mod models;
mod state;

use state::{AppState, ServiceConfig, TocSource};

/// Command-line arguments, each also readable from the environment or `.env`
#[derive(Parser, Debug)]
#[command(name = "pdfmeasure-api")]
#[command(about = "HTTP API for PDF page dimensions and measurements")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Origins allowed by CORS ("*" allows any origin)
    #[arg(
        long = "allowed-origin",
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    allowed_origins: Vec<String>,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "50")]
    max_upload_mb: usize,

    /// Source of table of contents entries
    #[arg(long, env = "TOC_SOURCE", value_enum, default_value_t = TocSource::Fixed)]
    toc_source: TocSource,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Routes without CORS, shared by `main` and the endpoint tests
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Current document
        .route("/upload", post(handlers::upload))
        .route("/document", get(handlers::document_info))
        // Geometry
        .route("/dimensions/:page_num", get(handlers::dimensions))
        .route("/measure", post(handlers::measure_element))
        .route("/table-of-contents", get(handlers::table_of_contents))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", o))
        })
        .collect::<Result<Vec<_>>>()?;

    // Credentials cannot be combined with wildcards, so mirror the request instead
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Filter used when `RUST_LOG` is not set
pub fn default_log_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("pdfmeasure_api={level},pdfmeasure_core={level},tower_http=debug")
}

/// Request body cap in bytes, clamped instead of wrapping on huge values
pub fn upload_limit_bytes(megabytes: usize) -> usize {
    megabytes.saturating_mul(1024 * 1024)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging; RUST_LOG replaces the defaults entirely when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_log_directives(args.verbose)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig {
        toc_source: args.toc_source,
        max_upload_bytes: upload_limit_bytes(args.max_upload_mb),
    };
    let state = Arc::new(AppState::new(config));

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&args.allowed_origins)?);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("PDF Measure API listening on http://{}", addr);
    info!("CORS origins: {}", args.allowed_origins.join(", "));
    info!(
        "Max upload: {} MB, TOC source: {:?}",
        args.max_upload_mb, args.toc_source
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
