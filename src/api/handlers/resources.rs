//! Resource usage and process management endpoints.

use axum::Json;
use serde_json::{Value, json};

use crate::api::ApiError;
use crate::auth::RequireAdmin;
use crate::system::resources::{self, KillRequest, PriorityRequest, SystemResources};

/// GET /api/resources
pub async fn system_resources() -> Json<SystemResources> {
    Json(resources::system_resources().await)
}

/// POST /api/resources/kill
pub async fn kill_process(
    _admin: RequireAdmin,
    Json(req): Json<KillRequest>,
) -> Result<Json<Value>, ApiError> {
    let message = resources::kill_process(req.pid, &req.signal).await?;
    Ok(Json(json!({ "message": message })))
}

/// POST /api/resources/priority
pub async fn set_process_priority(
    _admin: RequireAdmin,
    Json(req): Json<PriorityRequest>,
) -> Result<Json<Value>, ApiError> {
    let message = resources::set_process_priority(req.pid, req.priority).await?;
    Ok(Json(json!({ "message": message })))
}
