use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::select;
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::subscribers::QueueSink;

static NEXT_STREAM: AtomicU64 = AtomicU64::new(1);

pub(crate) async fn publish_report(State(state): State<AppState>, body: Bytes) -> Response {
    match serde_json::from_slice::<Value>(&body) {
        Ok(report) => {
            state.hub.ingest(report);
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "rejecting publish");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad input" }))).into_response()
        }
    }
}

pub(crate) async fn stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_reports(socket, state))
}

/// Pumps replay + live messages to one viewer until either side goes away.
async fn stream_reports(socket: WebSocket, state: AppState) {
    let name = format!("stream-{}", NEXT_STREAM.fetch_add(1, Ordering::Relaxed));
    let capacity = state.hub.config().queue_capacity_clamped();
    let (sink, mut queue) = QueueSink::channel(name.clone(), capacity);
    let subscription = state.hub.attach(Arc::new(sink));
    let (mut outbound, mut inbound) = socket.split();

    let reason = loop {
        select! {
            message = queue.recv() => {
                let Some(message) = message else {
                    let reason = if queue.is_lagged() { "lagged" } else { "detached" };
                    break reason;
                };
                let frame = match message.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(stream = %name, error = %e, "cannot encode message");
                        continue;
                    }
                };
                if let Err(e) = outbound.send(WsMessage::Text(frame)).await {
                    debug!(stream = %name, error = %e, "write failed");
                    break "write failed";
                }
            }
            incoming = inbound.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | None => break "closed by viewer",
                Some(Err(e)) => {
                    debug!(stream = %name, error = %e, "read failed");
                    break "read failed";
                }
                Some(Ok(_)) => {}
            },
            _ = state.shutdown.cancelled() => break "shutdown",
        }
    };

    subscription.detach();
    if reason != "closed by viewer" {
        let _ = outbound.send(WsMessage::Close(None)).await;
    }
    if reason == "lagged" {
        warn!(stream = %name, capacity, "viewer fell behind, stream closed");
    } else {
        info!(stream = %name, reason, "stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BroadcastHub, HubConfig};
    use tokio_util::sync::CancellationToken;

    fn state() -> AppState {
        AppState {
            hub: BroadcastHub::new(HubConfig::default()),
            shutdown: CancellationToken::new(),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_publish_ingests_json() {
        let state = state();
        let body = Bytes::from_static(br#"{"id":"r1","minversion":1,"tests":[]}"#);

        let response = publish_report(State(state.clone()), body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "success": true }));

        let cached = state.hub.cached();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0]["id"], "r1");
    }

    #[tokio::test]
    async fn test_publish_accepts_any_json_shape() {
        let state = state();
        let response = publish_report(State(state.clone()), Bytes::from_static(b"[1,2]")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.hub.cached().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_rejects_non_json() {
        let state = state();
        let response = publish_report(State(state.clone()), Bytes::from_static(b"nope")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "bad input" }));
        assert!(state.hub.cached().is_empty());
    }
}
