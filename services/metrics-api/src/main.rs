//! Field metrics API server.
//!
//! Serves the dashboard's field metrics and soil analysis endpoints over
//! the aggregation pipeline, with farm-ownership authorization in front.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use clap::Parser;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use metrics_api::handlers;
use metrics_api::state::AppState;

/// Field metrics API server
#[derive(Parser, Debug)]
#[command(name = "metrics-api")]
#[command(about = "HTTP API serving satellite field metrics")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8084", env = "METRICS_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "METRICS_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .expect("Failed to create Tokio runtime");

    runtime.block_on(async move {
        run_server(args).await;
    });
}

async fn run_server(args: Args) {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting field metrics API server");

    // Initialize application state
    let state = match AppState::new().await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    // Build router
    let app = Router::new()
        .route(
            "/api/fields/:field_id/metrics",
            get(handlers::field_metrics::field_metrics_handler),
        )
        .route(
            "/api/soil-analysis/dynamic",
            post(handlers::soil_analysis::soil_analysis_handler),
        )
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .expect("Failed to bind listen address");

    info!(listen = %args.listen, "Server listening");

    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
