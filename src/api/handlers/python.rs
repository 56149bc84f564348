//! Python environment endpoints.

use axum::Json;
use axum::extract::Query;
use serde_json::{Value, json};
use tracing::info;

use crate::api::ApiError;
use crate::auth::RequireAdmin;
use crate::system::python::{
    self, CreateEnvRequest, DeleteEnvRequest, EnvSelector, PackageRequest, PythonPackage,
    PythonVersion, RequirementsRequest, VirtualEnv,
};

#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// GET /api/python/versions
pub async fn python_versions() -> Json<Value> {
    let versions: Vec<PythonVersion> = python::python_versions().await;
    Json(json!({ "versions": versions }))
}

/// GET /api/python/environments
pub async fn list_environments() -> Json<Value> {
    let environments: Vec<VirtualEnv> = python::list_environments().await;
    Json(json!({ "environments": environments }))
}

/// POST /api/python/environments
pub async fn create_environment(
    _admin: RequireAdmin,
    Json(req): Json<CreateEnvRequest>,
) -> Result<Json<Value>, ApiError> {
    let path = python::create_environment(&req).await?;
    info!(name = %req.name, "virtual environment created");
    Ok(Json(json!({
        "message": format!("Virtual environment '{}' created successfully", req.name),
        "path": path,
    })))
}

/// DELETE /api/python/environments
pub async fn delete_environment(
    _admin: RequireAdmin,
    Json(req): Json<DeleteEnvRequest>,
) -> Result<Json<Value>, ApiError> {
    python::delete_environment(&req).await?;
    info!(name = %req.name, "virtual environment deleted");
    Ok(Json(json!({
        "message": format!("Virtual environment '{}' deleted successfully", req.name),
    })))
}

/// GET /api/python/packages
pub async fn list_packages(
    Query(env): Query<EnvSelector>,
) -> Result<Json<Value>, ApiError> {
    let packages = python::list_packages(&env).await?;
    Ok(Json(json!({ "packages": packages })))
}

/// POST /api/python/packages/install
pub async fn install_package(
    _admin: RequireAdmin,
    Json(req): Json<PackageRequest>,
) -> Result<Json<Value>, ApiError> {
    python::install_package(&req).await?;
    Ok(Json(json!({
        "message": format!("Package '{}' installed successfully", req.package_name),
    })))
}

/// DELETE /api/python/packages
pub async fn uninstall_package(
    _admin: RequireAdmin,
    Json(req): Json<PackageRequest>,
) -> Result<Json<Value>, ApiError> {
    python::uninstall_package(&req).await?;
    Ok(Json(json!({
        "message": format!("Package '{}' uninstalled successfully", req.package_name),
    })))
}

/// GET /api/python/requirements
pub async fn generate_requirements(
    Query(env): Query<EnvSelector>,
) -> Result<Json<Value>, ApiError> {
    let requirements = python::generate_requirements(&env).await?;
    Ok(Json(json!({ "requirements": requirements })))
}

/// POST /api/python/requirements/install
pub async fn install_requirements(
    _admin: RequireAdmin,
    Json(req): Json<RequirementsRequest>,
) -> Result<Json<Value>, ApiError> {
    python::install_requirements(&req).await?;
    Ok(Json(json!({ "message": "Requirements installed successfully" })))
}

/// GET /api/python/packages/search?q=...
pub async fn search_packages(
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let packages: Vec<PythonPackage> = python::search_packages(&query.q).await?;
    Ok(Json(json!({ "packages": packages })))
}
