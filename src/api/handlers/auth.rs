//! Login endpoint.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::auth::AuthError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub name: String,
    pub role: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let user = state
        .auth
        .validate_credentials(&req.username, &req.password)
        .ok_or(AuthError::InvalidCredentials)?;

    let token = state.auth.generate_token(user)?;
    info!(username = %user.username, "user logged in");

    Ok(Json(LoginResponse {
        token,
        username: user.username.clone(),
        name: user.name.clone(),
        role: user.role.to_string(),
    }))
}
