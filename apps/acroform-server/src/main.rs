//! AcroForm Server
//!
//! Serves the PDF form workflow over HTTP:
//!
//! - Upload a PDF and read its fillable fields
//! - Submit values and download the filled PDF
//! - Design text fields for a PDF without a form and download it fillable
//!
//! Page images for the designer are rendered by the client; the server only
//! receives the field rectangles in image pixels together with the render zoom.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod session;

use api::{
    handle_build, handle_delete, handle_fields, handle_fill, handle_get_template,
    handle_health, handle_put_template, handle_upload,
};
use session::{SessionStore, DEFAULT_MAX_SESSIONS};

/// Command-line arguments for the AcroForm server
#[derive(Parser, Debug)]
#[command(name = "acroform-server")]
#[command(about = "Fill PDF forms and design new form fields over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "ACROFORM_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Largest accepted PDF upload in megabytes
    #[arg(long, default_value = "50")]
    max_upload_mb: usize,

    /// Open sessions kept before the least recently used is dropped
    #[arg(long, env = "ACROFORM_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,

    /// Minutes an idle session is kept
    #[arg(long, env = "ACROFORM_SESSION_TTL_MINUTES", default_value = "60")]
    session_ttl_minutes: u64,

    /// Zoom the designer renders page images at
    #[arg(long, default_value_t = acroform_core::DEFAULT_RENDER_ZOOM)]
    render_zoom: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Zoom of the page images template rectangles were captured on
    pub render_zoom: f64,
}

/// Request body limit for a given PDF size; uploads arrive base64 encoded
fn body_limit(max_upload_mb: usize) -> usize {
    max_upload_mb * 1024 * 1024 / 3 * 4 + 64 * 1024
}

/// Build the application router
pub fn app(state: AppState, max_upload_mb: usize) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Fill workflow
        .route("/api/documents", post(handle_upload))
        .route("/api/documents/:id", delete(handle_delete))
        .route("/api/documents/:id/fields", get(handle_fields))
        .route("/api/documents/:id/fill", post(handle_fill))
        // Designer workflow
        .route(
            "/api/documents/:id/template",
            get(handle_get_template).put(handle_put_template),
        )
        .route("/api/documents/:id/build", post(handle_build))
        .layer(DefaultBodyLimit::max(body_limit(max_upload_mb)))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if !args.render_zoom.is_finite() || args.render_zoom <= 0.0 {
        anyhow::bail!("--render-zoom must be positive, got {}", args.render_zoom);
    }

    info!("Starting AcroForm server on {}:{}", args.host, args.port);

    let state = AppState {
        sessions: SessionStore::with_limits(
            args.max_sessions,
            Duration::from_secs(args.session_ttl_minutes * 60),
        ),
        render_zoom: args.render_zoom,
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = app(state, args.max_upload_mb).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Upload limit: {} MB", args.max_upload_mb);
    info!("Render zoom: {}", args.render_zoom);
    info!(
        "Sessions: up to {}, idle timeout {} min",
        args.max_sessions, args.session_ttl_minutes
    );

    axum::serve(listener, app).await?;

    Ok(())
}
