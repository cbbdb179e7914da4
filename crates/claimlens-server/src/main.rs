//! Claimlens Server
//!
//! HTTP front for the external claim table - answers a single
//! aggregation query (per-creator claim statistics plus a ranked
//! per-recipient preview) against CockroachDB/PostgreSQL.

mod handlers;
mod storage;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use claimlens_core::ClaimlensError;
use storage::Database;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Claimlens Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let config = load_config().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, table={}",
        config.bind_address, config.table
    );

    // Connect to the claim store and probe it once; an unreachable
    // store at startup is fatal
    info!("Connecting to claim store...");
    let db = Arc::new(
        Database::connect(&config)
            .await
            .context("Failed to connect to claim store")?,
    );
    info!("Claim store connection established");

    let config = Arc::new(config);
    let state = AppState {
        db,
        config: config.clone(),
    };

    // Build router
    info!("Building HTTP router...");
    let app = app(state);

    // Start server
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server ready to accept connections");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        // Landing page
        .route("/", get(handlers::pages::index))
        // Health check
        .route("/health", get(handlers::health))
        // Aggregation query
        .route("/query", post(handlers::query::query))
        // Static assets for the landing page
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        // Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub database_url: String,
    pub table: String,
    pub static_dir: PathBuf,
}

fn load_config() -> Result<Config> {
    info!("Loading configuration from environment...");

    // No fallback URL: the claim store holds real data and a baked-in
    // default connection string must never ship
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        ClaimlensError::Config(
            "DATABASE_URL is not set; refusing to start without a claim store".to_string(),
        )
    })?;

    let table = std::env::var("CLAIMS_TABLE").unwrap_or_else(|_| "public.merkle".to_string());
    if !storage::is_safe_table_name(&table) {
        return Err(ClaimlensError::Config(format!(
            "CLAIMS_TABLE contains unsupported characters: {}",
            table
        ))
        .into());
    }

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let static_dir = std::env::var("STATIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./static"));
    info!("Static assets directory: {}", static_dir.display());

    Ok(Config {
        bind_address,
        database_url,
        table,
        static_dir,
    })
}

#[cfg(test)]
pub(crate) fn test_state(static_dir: PathBuf) -> AppState {
    // Lazy pool against an unreachable port: paths that never run a
    // query stay testable without a live store, and paths that do run
    // one fail fast with a connection error
    let config = Config {
        bind_address: "127.0.0.1:0".to_string(),
        database_url: "postgres://127.0.0.1:1/claims".to_string(),
        table: "public.merkle".to_string(),
        static_dir,
    };
    let db = Database::connect_lazy(&config);
    AppState {
        db: Arc::new(db),
        config: Arc::new(config),
    }
}
