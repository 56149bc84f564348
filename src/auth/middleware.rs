//! Authentication middleware and extractors.

use std::sync::Arc;

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::warn;

use super::{AuthConfig, AuthError, Claims, ConsoleUser};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() || parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    decoding_key: Option<DecodingKey>,
}

impl AuthState {
    /// Create new auth state from config.
    /// Resolves `env:VAR_NAME` syntax in jwt_secret at construction time.
    pub fn new(mut config: AuthConfig) -> Self {
        if let Ok(Some(resolved)) = config.resolve_jwt_secret() {
            config.jwt_secret = Some(resolved);
        }

        let decoding_key = config
            .jwt_secret
            .as_ref()
            .map(|s| DecodingKey::from_secret(s.as_bytes()));

        Self {
            config: Arc::new(config),
            decoding_key,
        }
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Whether WebSocket upgrades are accepted from any origin.
    pub fn allow_any_origin(&self) -> bool {
        self.config.allow_any_origin
    }

    /// Validate login credentials against the configured console users.
    pub fn validate_credentials(&self, username: &str, password: &str) -> Option<&ConsoleUser> {
        self.config
            .users
            .iter()
            .find(|u| u.username == username && u.verify_password(password))
    }

    /// Validate a JWT token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let decoding_key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.required_spec_claims.clear(); // Allow missing iss/aud

        let token_data = decode::<Claims>(token, decoding_key, &validation).map_err(|e| {
            warn!("JWT validation failed: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Generate a JWT token for a console user.
    pub fn generate_token(&self, user: &ConsoleUser) -> Result<String, AuthError> {
        let secret = self
            .config
            .jwt_secret
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.username.clone(),
            exp: now + self.config.token_ttl_hours * 3600,
            iat: Some(now),
            iss: Some("opsdeck".to_string()),
            name: Some(user.name.clone()),
            role: Some(user.role.to_string()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

/// Authenticated user extracted from request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Validated claims for this request.
    pub claims: Claims,
}

impl CurrentUser {
    /// Get the username.
    pub fn username(&self) -> &str {
        &self.claims.sub
    }

    /// Check if the user is an admin.
    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

/// Authentication middleware.
///
/// Validates JWT tokens and injects `CurrentUser` into request extensions.
/// Supports multiple auth methods in priority order:
/// 1. Authorization: Bearer <token> header
/// 2. auth_token cookie
/// 3. token query parameter (for WebSocket connections)
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    // Cookie auth for browser clients (EventSource/WebSocket can't set headers).
    let cookie_token = req
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_header| token_from_cookie_header(cookie_header, "auth_token"));

    // Token in query parameter for WebSocket upgrade requests.
    let query_token = req.uri().query().and_then(|q| {
        q.split('&').find_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next()?;
            if key == "token" {
                urlencoding::decode(value).ok().map(|s| s.into_owned())
            } else {
                None
            }
        })
    });

    let claims = if let Some(header) = auth_header {
        let token = bearer_token_from_header(header)?;
        auth.validate_token(token)?
    } else if let Some(token) = cookie_token {
        auth.validate_token(token)?
    } else if let Some(ref token) = query_token {
        auth.validate_token(token)?
    } else {
        return Err(AuthError::MissingCredentials);
    };

    req.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(req).await)
}

/// Require admin role.
///
/// Use as an extractor in handlers that require admin access.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions(
                "admin role required".to_string(),
            ));
        }

        Ok(RequireAdmin(user))
    }
}
