//! JWT claims.

use serde::{Deserialize, Serialize};

use super::AuthError;

/// JWT claims structure.
///
/// The subject must be the numeric marketplace user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,

    /// Audience.
    #[serde(default)]
    pub aud: Option<Vec<String>>,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Issued at (as Unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,

    /// Not before (as Unix timestamp).
    #[serde(default)]
    pub nbf: Option<i64>,

    /// JWT ID.
    #[serde(default)]
    pub jti: Option<String>,

    /// User's email.
    #[serde(default)]
    pub email: Option<String>,

    /// User's name.
    #[serde(default)]
    pub name: Option<String>,

    /// User's preferred username.
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl Claims {
    /// Parse the subject as a user id.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        match self.sub.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(AuthError::InvalidToken(format!(
                "subject '{}' is not a user id",
                self.sub
            ))),
        }
    }

    /// Get the display name for the user.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.preferred_username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}
