//! # HTTP front of the broadcast hub.
//!
//! | Route                     | Method | Behavior                                        |
//! |---------------------------|--------|-------------------------------------------------|
//! | `/api/publish_report`     | POST   | body is a report → `ingest`, `{"success":true}` |
//! | `/api/stream`             | GET    | websocket upgrade → replay + live frames        |
//! | `/submit`, `/stream`      |        | aliases of the two routes above                 |
//!
//! A body that is not JSON is answered with `400 {"error":"bad input"}` and
//! never reaches the hub. Anything that is JSON is accepted as is.
//!
//! ## Shutdown
//! [`serve`] and [`serve_on`] stop accepting connections once the token is
//! cancelled. Open streams watch the same token and close themselves, which
//! detaches their subscriptions.

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::{BroadcastHub, ServerConfig};
use crate::error::ServerError;

/// Shared state of all handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) hub: Arc<BroadcastHub>,
    pub(crate) shutdown: CancellationToken,
}

/// Builds the router for `hub`.
///
/// Streams served by this router only end when the viewer or the transport
/// goes away; use [`serve_on`] to tie them to a shutdown token.
pub fn router(hub: Arc<BroadcastHub>) -> Router {
    app(AppState {
        hub,
        shutdown: CancellationToken::new(),
    })
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/publish_report", post(handlers::publish_report))
        .route("/api/stream", get(handlers::stream))
        .route("/submit", post(handlers::publish_report))
        .route("/stream", get(handlers::stream))
        .with_state(state)
}

/// Binds `config.listen`, builds a hub from `config.hub` and serves until
/// `shutdown` is cancelled.
pub async fn serve(config: ServerConfig, shutdown: CancellationToken) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.listen,
            source,
        })?;
    let hub = BroadcastHub::new(config.hub);
    serve_on(listener, hub, shutdown).await
}

/// Serves `hub` on an already bound listener until `shutdown` is cancelled.
pub async fn serve_on(
    listener: TcpListener,
    hub: Arc<BroadcastHub>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr = listener.local_addr().map_err(ServerError::Serve)?;
    info!(
        addr = %addr,
        cache_capacity = hub.config().cache_capacity_clamped(),
        "report server listening"
    );

    let app = app(AppState {
        hub,
        shutdown: shutdown.clone(),
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(ServerError::Serve)?;

    info!(addr = %addr, "report server stopped");
    Ok(())
}
