//! Terminal WebSocket endpoint.

use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use std::sync::Arc;
use tracing::info;

use crate::api::{ApiError, AppState};
use crate::auth::CurrentUser;
use crate::terminal;

/// GET /api/terminal (WebSocket)
///
/// Authentication happens before the upgrade: the middleware validated a
/// token (query parameter for browser clients) and injected `CurrentUser`.
/// No shell is spawned for unauthenticated requests.
pub async fn terminal_session(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if !state.origin_allowed(&headers) {
        return Err(ApiError::Forbidden("origin not allowed".to_string()));
    }

    let username = user.username().to_string();
    info!(user = %username, "terminal upgrade request");

    let config = Arc::clone(&state.terminal);
    Ok(ws.on_upgrade(move |socket| terminal::run_session(socket, username, config)))
}
