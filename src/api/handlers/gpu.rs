//! GPU telemetry endpoints.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::api::{ApiError, AppState};
use crate::system::gpu::{self, GpuReport};

const STREAM_INTERVAL: Duration = Duration::from_secs(1);

/// GET /api/gpu/info
pub async fn gpu_info() -> Json<GpuReport> {
    Json(gpu::gpu_info().await)
}

/// GET /api/gpu/stats/stream (WebSocket)
///
/// Pushes a telemetry snapshot every second until the client disconnects.
pub async fn stream_gpu_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if !state.origin_allowed(&headers) {
        return Err(ApiError::Forbidden("origin not allowed".to_string()));
    }
    Ok(ws.on_upgrade(relay_gpu_stats))
}

async fn relay_gpu_stats(socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut interval = tokio::time::interval(STREAM_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = gpu::gpu_info().await;
                let Ok(payload) = serde_json::to_string(&report) else {
                    continue;
                };
                if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!("gpu stats client closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
}
