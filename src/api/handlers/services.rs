//! systemd service endpoints.

use axum::Json;
use axum::extract::Path;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::ApiError;
use crate::auth::RequireAdmin;
use crate::system::services::{self, ServiceAction, ServiceList};

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub service: String,
    pub action: ServiceAction,
}

/// GET /api/services
pub async fn list_services() -> Result<Json<ServiceList>, ApiError> {
    Ok(Json(services::list_services().await?))
}

/// GET /api/services/{service}
pub async fn service_status(Path(service): Path<String>) -> Result<Json<Value>, ApiError> {
    let status = services::service_status(&service).await?;
    Ok(Json(json!({ "status": status })))
}

/// POST /api/services/control
pub async fn control_service(
    _admin: RequireAdmin,
    Json(req): Json<ControlRequest>,
) -> Result<Json<Value>, ApiError> {
    let output = services::control_service(&req.service, req.action).await?;
    info!(service = %req.service, action = req.action.as_str(), "service control");
    Ok(Json(json!({
        "message": format!("Service {} command executed", req.action.as_str()),
        "output": output,
    })))
}
