//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{test_app, test_app_with_token};

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::GET)
        .body(Body::empty())
        .unwrap()
}

fn get_authed(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::GET)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::POST)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_login_success() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/login")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "username": "admin",
                        "password": "adminpassword"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["token"].is_string());
    assert_eq!(json["username"], "admin");
    assert_eq!(json["role"], "admin");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/login")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "username": "admin",
                        "password": "wrong"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app();

    for uri in [
        "/api/system/info",
        "/api/resources",
        "/api/files?path=/tmp",
        "/api/terminal",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{uri} should require auth"
        );
    }
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let app = test_app();

    let response = app
        .oneshot(get_authed("/api/system/info", "not.a.real.token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_via_query_parameter() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get(&format!("/api/system/info?token={token}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_via_cookie() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/system/info")
                .method(Method::GET)
                .header(header::COOKIE, format!("auth_token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_system_info() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get_authed("/api/system/info", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["hostname"].is_string());
    assert!(json["kernel"].is_string());
}

#[tokio::test]
async fn test_resources_snapshot() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get_authed("/api/resources", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["cpu"]["cores"].as_u64().unwrap() >= 1);
    assert!(json["memory"]["total"].is_u64());
    assert!(json["disk"].is_array());
}

#[tokio::test]
async fn test_execute_command_returns_output() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(post_json(
            "/api/system/execute",
            &token,
            &json!({ "command": "echo integration" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["output"].as_str().unwrap().contains("integration"));
    assert_eq!(json["error"], false);
}

#[tokio::test]
async fn test_execute_command_failure_is_data_not_http_error() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(post_json(
            "/api/system/execute",
            &token,
            &json!({ "command": "false" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["error"], true);
}

#[tokio::test]
async fn test_files_listing_and_round_trip() {
    let (app, token) = test_app_with_token();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("note.txt");

    // Write through the API.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/files/content",
            &token,
            &json!({ "path": file_path, "content": "hello files" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Listing shows it.
    let response = app
        .clone()
        .oneshot(get_authed(
            &format!("/api/files?path={}", dir.path().display()),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let names: Vec<&str> = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"note.txt"));

    // Read it back.
    let response = app
        .clone()
        .oneshot(get_authed(
            &format!("/api/files/content?path={}", file_path.display()),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["content"], "hello files");

    // Delete it.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/files?path={}", file_path.display()))
                .method(Method::DELETE)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!file_path.exists());
}

#[tokio::test]
async fn test_files_missing_directory_is_404() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get_authed("/api/files?path=/nonexistent-opsdeck-dir", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_directory() {
    let (app, token) = test_app_with_token();
    let dir = tempfile::tempdir().unwrap();

    let response = app
        .oneshot(post_json(
            "/api/files/directory",
            &token,
            &json!({ "path": dir.path(), "name": "subdir" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(dir.path().join("subdir").is_dir());
}

#[tokio::test]
async fn test_service_status_served_at_service_path() {
    let (app, token) = test_app_with_token();

    // The name validator runs before any command, so a hostile name proves
    // the route resolves without needing systemctl on the test host.
    let response = app
        .oneshot(get_authed("/api/services/bad;name", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password_served_at_change_password_path() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(post_json(
            "/api/users/change-password",
            &token,
            &json!({ "username": "Bad Name", "newPassword": "secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_python_versions_route() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get_authed("/api/python/versions", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["versions"].is_array());
}

#[tokio::test]
async fn test_python_packages_require_environment() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get_authed("/api/python/packages", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_python_delete_refuses_plain_directory() {
    let (app, token) = test_app_with_token();
    let dir = tempfile::tempdir().unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/python/environments")
                .method(Method::DELETE)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "name": "plain",
                        "kind": "venv",
                        "path": dir.path(),
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(dir.path().exists());
}

#[tokio::test]
async fn test_compose_project_requires_path() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get_authed("/api/docker/compose/project", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compose_project_detail_reads_file() {
    let (app, token) = test_app_with_token();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("docker-compose.yml");
    std::fs::write(&file, "services:\n  web:\n    image: nginx\n").unwrap();

    let response = app
        .oneshot(get_authed(
            &format!("/api/docker/compose/project?path={}", file.display()),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["content"].as_str().unwrap().contains("nginx"));
    assert!(json["containers"].is_array());
}

#[tokio::test]
async fn test_gpu_info_reports_missing_hardware_gracefully() {
    let (app, token) = test_app_with_token();

    let response = app
        .oneshot(get_authed("/api/gpu/info", &token))
        .await
        .unwrap();
    // Always 200; hosts without nvidia-smi report the condition in the body.
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["gpus"].is_array());
}
