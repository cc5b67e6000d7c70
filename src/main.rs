//! English Ready - IELTS practice chat bot
//!
//! Hosts waterfall dialogs over HTTP with SSE, and a sectioned writing
//! editor that grades each section through an external oracle.

mod api;
mod bot;
mod config;
mod db;
mod dialog;
mod grading;
mod recognizer;
mod runtime;
mod state_machine;
mod writing;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use grading::{GradingOracle, HttpGradingOracle, LoggingOracle};
use runtime::{DatabaseStorage, RuntimeManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use writing::WritingService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "english_ready=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Dialogs
    let registry = bot::registry()?;
    if !registry.contains(&config.root_dialog) {
        return Err(format!(
            "Unknown root dialog '{}'; registered: {}",
            config.root_dialog,
            registry.names().join(", ")
        )
        .into());
    }
    let recognizer = recognizer::from_settings(config.luis.clone());
    let runtime = RuntimeManager::new(
        db.clone(),
        Arc::new(registry),
        recognizer,
        config.root_dialog.clone(),
    );

    // Grading
    let oracle: Arc<dyn GradingOracle> = Arc::new(HttpGradingOracle::new(
        &config.oracle_url,
        config.grading_timeout,
        config.grade_scale,
    )?);
    tracing::info!(
        url = %config.oracle_url,
        scale = ?config.grade_scale,
        policy = ?config.attempt_policy,
        "Grading oracle configured"
    );
    let writing = WritingService::new(
        Arc::new(DatabaseStorage::new(db)),
        Arc::new(LoggingOracle::new(oracle)),
        config.attempt_policy,
    );

    let state = AppState::new(runtime, writing);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(root = %config.root_dialog, "English Ready listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
