//! Authentication errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors raised during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization")]
    MissingCredentials,

    #[error("invalid authorization header")]
    InvalidAuthHeader,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("authentication error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
