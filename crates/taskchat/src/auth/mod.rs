//! Authentication module.
//!
//! Provides JWT validation middleware with support for:
//! - HS256 tokens issued by this service or a trusted issuer
//! - Dev bypass mode with configurable test users

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::Claims;
pub use config::{AuthConfig, ConfigValidationError, DevUser};
pub use error::AuthError;
pub use middleware::{AUTH_COOKIE_NAME, AuthState, CurrentUser, DEV_USER_HEADER, auth_middleware};
