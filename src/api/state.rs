//! Application state shared across handlers.

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::auth::AuthState;
use crate::terminal::TerminalConfig;

/// Shared state for the API layer.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub terminal: Arc<TerminalConfig>,
}

impl AppState {
    pub fn new(auth: AuthState, terminal: TerminalConfig) -> Self {
        Self {
            auth,
            terminal: Arc::new(terminal),
        }
    }

    /// Origin policy for WebSocket upgrades.
    ///
    /// Browsers send an Origin header on upgrade requests; non-browser
    /// clients usually omit it and are accepted. Browser origins must be
    /// on the configured allow list unless `allow_any_origin` is set.
    pub fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        if self.auth.allow_any_origin() {
            return true;
        }

        match headers.get("origin").and_then(|v| v.to_str().ok()) {
            Some(origin) => self
                .auth
                .allowed_origins()
                .iter()
                .any(|allowed| allowed == origin),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use axum::http::HeaderValue;

    fn state(allow_any: bool) -> AppState {
        let config = AuthConfig {
            jwt_secret: Some("a-secret-that-is-long-enough-for-hs256".to_string()),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_any_origin: allow_any,
            ..AuthConfig::default()
        };
        AppState::new(AuthState::new(config), TerminalConfig::default())
    }

    #[test]
    fn test_origin_allowed_list() {
        let state = state(false);

        let mut headers = HeaderMap::new();
        headers.insert("origin", HeaderValue::from_static("http://localhost:3000"));
        assert!(state.origin_allowed(&headers));

        headers.insert("origin", HeaderValue::from_static("http://evil.example"));
        assert!(!state.origin_allowed(&headers));
    }

    #[test]
    fn test_origin_missing_is_allowed() {
        let state = state(false);
        assert!(state.origin_allowed(&HeaderMap::new()));
    }

    #[test]
    fn test_allow_any_origin_override() {
        let state = state(true);
        let mut headers = HeaderMap::new();
        headers.insert("origin", HeaderValue::from_static("http://evil.example"));
        assert!(state.origin_allowed(&headers));
    }
}
