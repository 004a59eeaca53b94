//! Roost Metadata Server
//!
//! HTTP transport over the [`roost_metadata`] resolver: a single
//! catch-all route feeds every request path to the metadata service, with
//! the client identity taken from the connection's source address. The
//! wire contract is deliberately narrow: 200 with a body, or 404 with an
//! empty one.

mod api;
mod config;

pub use config::ServerConfig;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use roost_metadata::{FileStore, MetadataService};
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<MetadataService>,
}

/// Build the metadata router for `config`.
///
/// Exposed separately from [`run`] so tests can drive the router without
/// binding a socket.
pub fn app(config: &ServerConfig) -> Router {
    let service = MetadataService::new(FileStore::new(&config.base_dir));
    let state = AppState {
        service: Arc::new(service),
    };

    Router::new()
        .fallback(api::serve_metadata)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(middleware::map_response(flatten_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    tracing::debug_span!(
                        "http-request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .with_state(state)
}

/// Bind the listener and serve until Ctrl+C or SIGTERM.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let app = app(&config);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(
        "metadata server listening on http://{}",
        listener.local_addr().context("failed to get local address")?
    );
    info!("serving metadata from {}", config.base_dir.display());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// The wire surface is 200-with-body or 404-with-empty-body. The request
/// deadline layer answers a stalled request with 408; collapse that to
/// the same not-found every other failure maps to.
async fn flatten_timeout(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return StatusCode::NOT_FOUND.into_response();
    }
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            signal.recv().await;
            info!("received SIGTERM, shutting down");
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
