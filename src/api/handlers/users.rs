//! Linux account endpoints.

use axum::Json;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::ApiError;
use crate::auth::RequireAdmin;
use crate::system::users::{
    self, ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, UserList,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserQuery {
    #[serde(default)]
    pub remove_home: bool,
}

/// GET /api/users
pub async fn list_users() -> Result<Json<UserList>, ApiError> {
    Ok(Json(users::list_users().await?))
}

/// POST /api/users
pub async fn create_user(
    _admin: RequireAdmin,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    users::create_user(&req).await?;
    info!(username = %req.username, "linux user created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully" })),
    ))
}

/// PUT /api/users/{username}
pub async fn update_user(
    _admin: RequireAdmin,
    Path(username): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    users::update_user(&username, &req).await?;
    Ok(Json(json!({ "message": "User updated successfully" })))
}

/// DELETE /api/users/{username}?removeHome=true
pub async fn delete_user(
    _admin: RequireAdmin,
    Path(username): Path<String>,
    Query(query): Query<DeleteUserQuery>,
) -> Result<Json<Value>, ApiError> {
    users::delete_user(&username, query.remove_home).await?;
    info!(username = %username, remove_home = query.remove_home, "linux user deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// POST /api/users/change-password
pub async fn change_password(
    _admin: RequireAdmin,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    users::change_password(&req).await?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
