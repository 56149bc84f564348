//! Authentication module.
//!
//! JWT-based authentication for the admin console. Tokens are issued by the
//! login endpoint against console users defined in the configuration file and
//! validated by middleware on every protected route. WebSocket clients pass
//! the token as a query parameter since browsers cannot set headers on the
//! upgrade request.

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::{Claims, Role};
pub use config::{AuthConfig, ConfigValidationError, ConsoleUser};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, RequireAdmin, auth_middleware};
