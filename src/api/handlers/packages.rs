//! Debian package endpoints.

use axum::Json;
use axum::extract::Query;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::ApiError;
use crate::auth::RequireAdmin;
use crate::system::packages::{self, InstalledPackage, PackageSearchResult};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct InstallRequest {
    pub package: String,
}

/// GET /api/packages
pub async fn list_installed() -> Result<Json<Vec<InstalledPackage>>, ApiError> {
    Ok(Json(packages::list_installed().await?))
}

/// GET /api/packages/search?q=...
pub async fn search(
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PackageSearchResult>>, ApiError> {
    Ok(Json(packages::search(&query.q).await?))
}

/// POST /api/packages/install
///
/// Returns immediately; the install runs in the background.
pub async fn install(
    _admin: RequireAdmin,
    Json(req): Json<InstallRequest>,
) -> Result<Json<Value>, ApiError> {
    packages::install_detached(&req.package)?;
    Ok(Json(json!({ "message": "Package installation started" })))
}
