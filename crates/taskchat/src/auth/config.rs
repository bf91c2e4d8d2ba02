//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Upper bound on `token_ttl_hours` (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enable development mode (dev users, `X-Dev-User` header).
    pub dev_mode: bool,

    /// JWT secret for HS256. Supports `env:VAR_NAME`.
    /// REQUIRED when dev_mode is false.
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens, in hours.
    pub token_ttl_hours: i64,

    /// Development users (only used in dev mode).
    /// Passwords are stored as bcrypt hashes.
    pub dev_users: Vec<DevUser>,

    /// Allowed CORS origins. If empty in production, CORS is disabled.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            // No default JWT secret - must be explicitly configured
            jwt_secret: None,
            token_ttl_hours: 24,
            dev_users: Vec::new(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
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

    /// Validate the configuration for the current mode.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.token_ttl_hours <= 0 || self.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigValidationError::InvalidTokenTtl);
        }

        // `env:` references must resolve in every mode.
        let secret = self.resolve_jwt_secret()?;

        if !self.dev_mode {
            let secret = secret.ok_or(ConfigValidationError::MissingJwtSecret)?;

            if secret.len() < 32 {
                return Err(ConfigValidationError::JwtSecretTooShort);
            }
        }

        Ok(())
    }

    /// Generate a random 64-character alphanumeric JWT secret.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error(
        "JWT secret is required when dev_mode is false. Set TASKCHAT__AUTH__JWT_SECRET or auth.jwt_secret in config."
    )]
    MissingJwtSecret,

    #[error("JWT secret must be at least 32 characters long.")]
    JwtSecretTooShort,

    #[error("auth.token_ttl_hours must be between 1 and 8760.")]
    InvalidTokenTtl,

    #[error("Environment variable '{0}' not found (referenced via env: in config).")]
    EnvVarNotFound(String),

    #[error("Environment variable '{0}' is empty (referenced via env: in config).")]
    EnvVarEmpty(String),
}

/// Development user configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevUser {
    /// Marketplace user ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
}

impl DevUser {
    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}
