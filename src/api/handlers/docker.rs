//! Docker endpoints, including the log-follow WebSocket.

use axum::Json;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::api::{ApiError, AppState};
use crate::auth::RequireAdmin;
use crate::docker::{
    self, ContainerInfo, ContainerStats, CreateContainerRequest, ImageInfo, NetworkInfo,
    VolumeInfo,
};

#[derive(Debug, Deserialize)]
pub struct NamedResourceRequest {
    pub name: String,
    #[serde(default)]
    pub driver: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_tail")]
    pub tail: String,
}

fn default_tail() -> String {
    "100".to_string()
}

#[derive(Debug, Deserialize)]
pub struct DeleteVolumeQuery {
    pub name: String,
}

/// GET /api/docker/containers
pub async fn list_containers() -> Result<Json<Vec<ContainerInfo>>, ApiError> {
    Ok(Json(docker::list_containers().await?))
}

/// GET /api/docker/containers/{id}
pub async fn inspect_container(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    Ok(Json(docker::inspect_container(&id).await?))
}

/// POST /api/docker/containers
pub async fn create_container(
    _admin: RequireAdmin,
    Json(req): Json<CreateContainerRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = docker::create_container(&req).await?;
    info!(container = %id, image = %req.image, "container created");
    Ok(Json(json!({ "message": "Container created successfully", "id": id })))
}

/// POST /api/docker/containers/{id}/start
pub async fn start_container(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    docker::start_container(&id).await?;
    Ok(Json(json!({ "message": "Container started successfully" })))
}

/// POST /api/docker/containers/{id}/stop
pub async fn stop_container(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    docker::stop_container(&id).await?;
    Ok(Json(json!({ "message": "Container stopped successfully" })))
}

/// POST /api/docker/containers/{id}/restart
pub async fn restart_container(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    docker::restart_container(&id).await?;
    Ok(Json(json!({ "message": "Container restarted successfully" })))
}

/// DELETE /api/docker/containers/{id}
pub async fn remove_container(
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    docker::remove_container(&id).await?;
    Ok(Json(json!({ "message": "Container deleted successfully" })))
}

/// GET /api/docker/containers/{id}/logs
pub async fn container_logs(
    Path(id): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Value>, ApiError> {
    let logs = docker::container_logs(&id, &query.tail).await?;
    Ok(Json(json!({ "logs": logs })))
}

/// GET /api/docker/containers/{id}/logs/stream (WebSocket)
///
/// Streams `docker logs -f` line by line as text frames. Closing the
/// socket kills the follower process.
pub async fn stream_container_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if !state.origin_allowed(&headers) {
        return Err(ApiError::Forbidden("origin not allowed".to_string()));
    }
    Ok(ws.on_upgrade(move |socket| relay_log_stream(socket, id)))
}

async fn relay_log_stream(socket: WebSocket, container_id: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (_child, mut lines) = match docker::spawn_log_follower(&container_id) {
        Ok(pair) => pair,
        Err(err) => {
            let _ = ws_tx
                .send(Message::Text(format!("Error: {}", err).into()))
                .await;
            return;
        }
    };

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if ws_tx.send(Message::Text(line.into())).await.is_err() {
                        break;
                    }
                }
                Ok(None) | Err(_) => break,
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!(container = %container_id, "log stream client closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
    // _child is killed on drop.
}

/// GET /api/docker/images
pub async fn list_images() -> Result<Json<Vec<ImageInfo>>, ApiError> {
    Ok(Json(docker::list_images().await?))
}

/// POST /api/docker/images/pull
pub async fn pull_image(
    _admin: RequireAdmin,
    Json(req): Json<PullRequest>,
) -> Result<Json<Value>, ApiError> {
    let output = docker::pull_image(&req.image).await?;
    Ok(Json(json!({ "message": "Image pulled successfully", "output": output })))
}

/// DELETE /api/docker/images/{id}
pub async fn remove_image(
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    docker::remove_image(&id).await?;
    Ok(Json(json!({ "message": "Image deleted successfully" })))
}

/// GET /api/docker/networks
pub async fn list_networks() -> Result<Json<Vec<NetworkInfo>>, ApiError> {
    Ok(Json(docker::list_networks().await?))
}

/// POST /api/docker/networks
pub async fn create_network(
    _admin: RequireAdmin,
    Json(req): Json<NamedResourceRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = docker::create_network(&req.name, &req.driver).await?;
    Ok(Json(json!({ "message": "Network created successfully", "id": id })))
}

/// DELETE /api/docker/networks/{id}
pub async fn remove_network(
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    docker::remove_network(&id).await?;
    Ok(Json(json!({ "message": "Network deleted successfully" })))
}

/// GET /api/docker/volumes
pub async fn list_volumes() -> Result<Json<Vec<VolumeInfo>>, ApiError> {
    Ok(Json(docker::list_volumes().await?))
}

/// POST /api/docker/volumes
pub async fn create_volume(
    _admin: RequireAdmin,
    Json(req): Json<NamedResourceRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = docker::create_volume(&req.name, &req.driver).await?;
    Ok(Json(json!({ "message": "Volume created successfully", "name": name })))
}

/// DELETE /api/docker/volumes
pub async fn remove_volume(
    _admin: RequireAdmin,
    Query(query): Query<DeleteVolumeQuery>,
) -> Result<Json<Value>, ApiError> {
    docker::remove_volume(&query.name).await?;
    Ok(Json(json!({ "message": "Volume deleted successfully" })))
}

/// GET /api/docker/stats
pub async fn container_stats() -> Result<Json<Vec<ContainerStats>>, ApiError> {
    Ok(Json(docker::container_stats().await?))
}

/// POST /api/docker/cleanup
pub async fn cleanup(_admin: RequireAdmin) -> Json<Value> {
    let results: HashMap<String, String> = docker::cleanup().await;
    Json(json!({ "message": "Cleanup completed", "results": results }))
}

#[derive(Debug, Deserialize)]
pub struct ComposePathQuery {
    pub path: std::path::PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct SaveComposeRequest {
    pub path: std::path::PathBuf,
    pub content: String,
}

/// GET /api/docker/compose/projects
pub async fn list_compose_projects() -> Json<Vec<docker::compose::ComposeProject>> {
    Json(docker::compose::list_projects().await)
}

/// GET /api/docker/compose/project?path=...
pub async fn compose_project_detail(
    Query(query): Query<ComposePathQuery>,
) -> Result<Json<docker::compose::ComposeProjectDetail>, ApiError> {
    Ok(Json(docker::compose::project_detail(&query.path).await?))
}

/// POST /api/docker/compose/project
pub async fn save_compose_project(
    _admin: RequireAdmin,
    Json(req): Json<SaveComposeRequest>,
) -> Result<Json<Value>, ApiError> {
    docker::compose::save_project(&req.path, &req.content).await?;
    Ok(Json(json!({ "message": "Project saved successfully" })))
}

/// POST /api/docker/compose/up?path=...
pub async fn compose_up(
    _admin: RequireAdmin,
    Query(query): Query<ComposePathQuery>,
) -> Result<Json<Value>, ApiError> {
    let output = docker::compose::up(&query.path).await?;
    info!(project = %query.path.display(), "compose project started");
    Ok(Json(json!({ "message": "Project started successfully", "output": output })))
}

/// POST /api/docker/compose/down?path=...
pub async fn compose_down(
    _admin: RequireAdmin,
    Query(query): Query<ComposePathQuery>,
) -> Result<Json<Value>, ApiError> {
    let output = docker::compose::down(&query.path).await?;
    Ok(Json(json!({ "message": "Project stopped successfully", "output": output })))
}

/// POST /api/docker/compose/restart?path=...
pub async fn compose_restart(
    _admin: RequireAdmin,
    Query(query): Query<ComposePathQuery>,
) -> Result<Json<Value>, ApiError> {
    let output = docker::compose::restart(&query.path).await?;
    Ok(Json(json!({ "message": "Project restarted successfully", "output": output })))
}

/// GET /api/docker/info
pub async fn docker_info() -> Result<Json<Value>, ApiError> {
    Ok(Json(docker::docker_info().await?))
}

/// GET /api/docker/version
pub async fn docker_version() -> Result<Json<Value>, ApiError> {
    Ok(Json(docker::docker_version().await?))
}
