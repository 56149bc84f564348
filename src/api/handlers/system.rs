//! Host info and ad-hoc command execution.

use axum::Json;
use serde::Deserialize;

use crate::api::ApiError;
use crate::auth::RequireAdmin;
use crate::system::info::{self, CommandResult, DetailedSystemInfo, SystemInfo};

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
}

/// GET /api/system/info
pub async fn system_info() -> Json<SystemInfo> {
    Json(info::system_info().await)
}

/// GET /api/system/info/detailed
pub async fn detailed_system_info() -> Json<DetailedSystemInfo> {
    Json(info::detailed_system_info().await)
}

/// POST /api/system/execute
///
/// Admin only; runs an arbitrary shell command. The HTTP status is 200
/// even when the command fails, with the failure reported in the payload.
pub async fn execute_command(
    _admin: RequireAdmin,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<CommandResult>, ApiError> {
    if req.command.trim().is_empty() {
        return Err(ApiError::bad_request("command is required"));
    }
    let result = info::execute_command(&req.command).await?;
    Ok(Json(result))
}
