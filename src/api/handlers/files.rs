//! File manager endpoints.

use std::path::PathBuf;

use axum::Json;
use axum::extract::Query;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::ApiError;
use crate::files::{self, DirectoryListing, FileContent};

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct SaveFileRequest {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectoryRequest {
    pub path: PathBuf,
    pub name: String,
}

/// GET /api/files?path=/some/dir
pub async fn list_directory(
    Query(query): Query<PathQuery>,
) -> Result<Json<DirectoryListing>, ApiError> {
    let path = query.path.unwrap_or_else(|| PathBuf::from("/home"));
    Ok(Json(files::list_directory(&path).await?))
}

/// GET /api/files/content?path=/some/file
pub async fn read_file(Query(query): Query<PathQuery>) -> Result<Json<FileContent>, ApiError> {
    let path = query
        .path
        .ok_or_else(|| ApiError::bad_request("path is required"))?;
    Ok(Json(files::read_file(&path).await?))
}

/// POST /api/files/content
pub async fn write_file(Json(req): Json<SaveFileRequest>) -> Result<Json<Value>, ApiError> {
    files::write_file(&req.path, &req.content).await?;
    Ok(Json(json!({ "message": "File saved successfully", "path": req.path })))
}

/// POST /api/files/directory
pub async fn create_directory(
    Json(req): Json<CreateDirectoryRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let created = files::create_directory(&req.path, &req.name).await?;
    Ok(Json(json!({ "message": "Directory created successfully", "path": created })))
}

/// DELETE /api/files?path=/some/file
pub async fn delete(Query(query): Query<PathQuery>) -> Result<Json<Value>, ApiError> {
    let path = query
        .path
        .ok_or_else(|| ApiError::bad_request("path is required"))?;
    let result = files::delete(&path).await?;
    Ok(Json(json!({
        "message": "Successfully deleted",
        "path": result.path,
        "isDir": result.is_dir,
    })))
}
