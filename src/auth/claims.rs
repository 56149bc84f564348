//! JWT claims and user roles.

use serde::{Deserialize, Serialize};

/// User role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user.
    #[default]
    User,
    /// Administrator.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// JWT claims for console sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the Unix-style username the session acts as).
    pub sub: String,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Issued at (as Unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,

    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Role claim.
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    /// Get the effective role for the user.
    pub fn effective_role(&self) -> Role {
        match self.role {
            Some(ref role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    /// Check if the user has admin role.
    pub fn is_admin(&self) -> bool {
        self.effective_role() == Role::Admin
    }

    /// Get the display name for the user.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.sub)
    }
}
