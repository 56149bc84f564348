//! Test utilities and common setup.

use axum::Router;
use opsdeck::api::{self, AppState};
use opsdeck::auth::{AuthConfig, AuthState, ConsoleUser, Role};
use opsdeck::terminal::TerminalConfig;

/// Create a test AuthConfig with a JWT secret and one admin user.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Some("test-secret-for-integration-tests-minimum-32-chars".to_string()),
        users: vec![ConsoleUser {
            username: "admin".to_string(),
            name: "Test Admin".to_string(),
            // bcrypt cost 4 keeps the test suite fast
            password_hash: bcrypt::hash("adminpassword", 4).unwrap(),
            role: Role::Admin,
        }],
        ..AuthConfig::default()
    }
}

/// Create a test application router.
pub fn test_app() -> Router {
    let state = AppState::new(AuthState::new(test_auth_config()), TerminalConfig::default());
    api::build_router(state)
}

/// Create a test application and a valid token for the admin user.
pub fn test_app_with_token() -> (Router, String) {
    let auth_state = AuthState::new(test_auth_config());
    let user = auth_state
        .validate_credentials("admin", "adminpassword")
        .unwrap()
        .clone();
    let token = auth_state.generate_token(&user).unwrap();

    let state = AppState::new(auth_state, TerminalConfig::default());
    (api::build_router(state), token)
}
