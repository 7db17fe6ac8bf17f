//! HTTP layer.
//!
//! Handlers are stateless one-shot pipelines over shared [`Services`].
//! Responses are JSON when the client asks for it and small HTML fragments
//! otherwise; every failure becomes `{"error": ...}` with status 500.

pub mod extract;
pub mod handlers;
pub mod pages;
pub mod response;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::app::Services;
use crate::metrics;

pub type AppState = Arc<Services>;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::index).post(handlers::login))
        .route("/admin", get(handlers::admin))
        .route("/chatbot", get(handlers::chatbot))
        .route("/static/app.js", get(handlers::app_js))
        .route("/static/style.css", get(handlers::style_css))
        .route("/upload", post(handlers::upload))
        .route("/query", post(handlers::query))
        .route("/agent", post(handlers::agent))
        .route("/health", get(handlers::health))
        .route("/indexes", get(handlers::indexes))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::record_http_request(&method, &route, response.status().as_u16(), start.elapsed());
    response
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "Web server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
