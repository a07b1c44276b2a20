//! LinkGuard API Server

mod auth;
mod handlers;
mod rate_limiter;
mod state;

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use clap::Parser;
use linkguard_scan_engine::ScannerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[derive(Parser)]
#[command(name = "linkguard-server", about = "URL threat analysis API")]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Path to a JSON config file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/v1/scan", post(handlers::scan_url))
        .route("/api/v1/stats", get(handlers::get_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limiter::rate_limit,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting LinkGuard API Server");

    let config = match &args.config {
        Some(path) => ScannerConfig::from_file(path)?,
        None => ScannerConfig::default(),
    };

    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    info!("Server listening on http://{}", args.listen);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
