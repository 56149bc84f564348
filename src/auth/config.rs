//! Authentication configuration.

use serde::{Deserialize, Serialize};

use super::Role;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT secret for HS256. Supports `env:VAR_NAME` indirection.
    /// REQUIRED to issue or validate tokens.
    pub jwt_secret: Option<String>,

    /// Console users allowed to log in. Passwords are stored as bcrypt hashes.
    pub users: Vec<ConsoleUser>,

    /// Allowed CORS origins for browser clients.
    pub allowed_origins: Vec<String>,

    /// Accept WebSocket upgrades from any origin. The original console allowed
    /// every origin unconditionally; here it is an explicit opt-in meant for
    /// development setups only.
    pub allow_any_origin: bool,

    /// Token lifetime in hours.
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No default JWT secret - must be explicitly configured
            jwt_secret: None,
            users: Vec::new(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
            allow_any_origin: false,
            token_ttl_hours: 24,
        }
    }
}

/// A console user defined in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleUser {
    /// Login and Unix-style username.
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Bcrypt hash of the password.
    pub password_hash: String,
    /// Role for authorization.
    #[serde(default)]
    pub role: Role,
}

impl ConsoleUser {
    /// Verify a password against the stored bcrypt hash.
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Validate the configuration before serving.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret = self.resolve_jwt_secret()?;

        match secret {
            None => return Err(ConfigValidationError::MissingJwtSecret),
            Some(ref secret) if secret.len() < 32 => {
                return Err(ConfigValidationError::JwtSecretTooShort);
            }
            Some(_) => {}
        }

        if self.users.is_empty() {
            return Err(ConfigValidationError::NoUsers);
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("auth.jwt_secret is required")]
    MissingJwtSecret,
    #[error("auth.jwt_secret must be at least 32 characters")]
    JwtSecretTooShort,
    #[error("auth.users must contain at least one console user")]
    NoUsers,
    #[error("environment variable {0} referenced by auth.jwt_secret is not set")]
    EnvVarNotFound(String),
    #[error("environment variable {0} referenced by auth.jwt_secret is empty")]
    EnvVarEmpty(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, password: &str) -> ConsoleUser {
        ConsoleUser {
            username: username.to_string(),
            name: username.to_string(),
            password_hash: bcrypt::hash(password, 4).unwrap(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = AuthConfig {
            users: vec![user("alice", "pw")],
            ..AuthConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::MissingJwtSecret)
        );
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let config = AuthConfig {
            jwt_secret: Some("short".to_string()),
            users: vec![user("alice", "pw")],
            ..AuthConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::JwtSecretTooShort)
        );
    }

    #[test]
    fn test_validate_requires_users() {
        let config = AuthConfig {
            jwt_secret: Some("a-secret-that-is-long-enough-for-hs256".to_string()),
            ..AuthConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigValidationError::NoUsers));
    }

    #[test]
    fn test_verify_password() {
        let u = user("alice", "correct horse");
        assert!(u.verify_password("correct horse"));
        assert!(!u.verify_password("battery staple"));
    }

    #[test]
    fn test_env_secret_resolution() {
        // Safety: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("OPSDECK_TEST_JWT_SECRET", "resolved-secret-0123456789abcdef") };
        let config = AuthConfig {
            jwt_secret: Some("env:OPSDECK_TEST_JWT_SECRET".to_string()),
            ..AuthConfig::default()
        };
        assert_eq!(
            config.resolve_jwt_secret().unwrap().as_deref(),
            Some("resolved-secret-0123456789abcdef")
        );
    }
}
