//! Route table.

use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;
use crate::auth::auth_middleware;

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    if state.auth.allow_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<axum::http::HeaderValue> = state
        .auth
        .allowed_origins()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full application router.
///
/// Everything under /api except the login endpoint requires a valid token;
/// the auth middleware accepts it from the Authorization header, the
/// auth_token cookie or (for WebSocket clients) the token query parameter.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/system/info", get(handlers::system::system_info))
        .route(
            "/system/info/detailed",
            get(handlers::system::detailed_system_info),
        )
        .route("/system/execute", post(handlers::system::execute_command))
        .route("/services", get(handlers::services::list_services))
        .route(
            "/services/{service}",
            get(handlers::services::service_status),
        )
        .route("/services/control", post(handlers::services::control_service))
        .route(
            "/docker/containers",
            get(handlers::docker::list_containers).post(handlers::docker::create_container),
        )
        .route(
            "/docker/containers/{id}",
            get(handlers::docker::inspect_container).delete(handlers::docker::remove_container),
        )
        .route(
            "/docker/containers/{id}/start",
            post(handlers::docker::start_container),
        )
        .route(
            "/docker/containers/{id}/stop",
            post(handlers::docker::stop_container),
        )
        .route(
            "/docker/containers/{id}/restart",
            post(handlers::docker::restart_container),
        )
        .route(
            "/docker/containers/{id}/logs",
            get(handlers::docker::container_logs),
        )
        .route(
            "/docker/containers/{id}/logs/stream",
            get(handlers::docker::stream_container_logs),
        )
        .route(
            "/docker/images",
            get(handlers::docker::list_images),
        )
        .route("/docker/images/pull", post(handlers::docker::pull_image))
        .route(
            "/docker/images/{id}",
            delete(handlers::docker::remove_image),
        )
        .route(
            "/docker/networks",
            get(handlers::docker::list_networks).post(handlers::docker::create_network),
        )
        .route(
            "/docker/networks/{id}",
            delete(handlers::docker::remove_network),
        )
        .route(
            "/docker/volumes",
            get(handlers::docker::list_volumes)
                .post(handlers::docker::create_volume)
                .delete(handlers::docker::remove_volume),
        )
        .route(
            "/docker/compose/projects",
            get(handlers::docker::list_compose_projects),
        )
        .route(
            "/docker/compose/project",
            get(handlers::docker::compose_project_detail)
                .post(handlers::docker::save_compose_project),
        )
        .route("/docker/compose/up", post(handlers::docker::compose_up))
        .route("/docker/compose/down", post(handlers::docker::compose_down))
        .route(
            "/docker/compose/restart",
            post(handlers::docker::compose_restart),
        )
        .route("/docker/stats", get(handlers::docker::container_stats))
        .route("/docker/cleanup", post(handlers::docker::cleanup))
        .route("/docker/info", get(handlers::docker::docker_info))
        .route("/docker/version", get(handlers::docker::docker_version))
        .route("/gpu/info", get(handlers::gpu::gpu_info))
        .route("/gpu/stats/stream", get(handlers::gpu::stream_gpu_stats))
        .route(
            "/python/versions",
            get(handlers::python::python_versions),
        )
        .route(
            "/python/environments",
            get(handlers::python::list_environments)
                .post(handlers::python::create_environment)
                .delete(handlers::python::delete_environment),
        )
        .route(
            "/python/packages",
            get(handlers::python::list_packages).delete(handlers::python::uninstall_package),
        )
        .route(
            "/python/packages/install",
            post(handlers::python::install_package),
        )
        .route(
            "/python/packages/search",
            get(handlers::python::search_packages),
        )
        .route(
            "/python/requirements",
            get(handlers::python::generate_requirements),
        )
        .route(
            "/python/requirements/install",
            post(handlers::python::install_requirements),
        )
        .route("/packages", get(handlers::packages::list_installed))
        .route("/packages/search", get(handlers::packages::search))
        .route("/packages/install", post(handlers::packages::install))
        .route("/resources", get(handlers::resources::system_resources))
        .route(
            "/resources/info",
            get(handlers::system::detailed_system_info),
        )
        .route("/resources/kill", post(handlers::resources::kill_process))
        .route(
            "/resources/priority",
            post(handlers::resources::set_process_priority),
        )
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{username}",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route(
            "/users/change-password",
            post(handlers::users::change_password),
        )
        .route(
            "/files",
            get(handlers::files::list_directory).delete(handlers::files::delete),
        )
        .route(
            "/files/content",
            get(handlers::files::read_file).post(handlers::files::write_file),
        )
        .route("/files/directory", post(handlers::files::create_directory))
        .route("/terminal", get(handlers::terminal::terminal_session))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(handlers::auth::login));

    public
        .nest("/api", protected)
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
