//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::{debug, error, warn};
use std::sync::Arc;

use super::{AuthConfig, AuthError, Claims, DevUser};

/// Name of the cookie carrying the session token.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Header accepted in dev mode in place of a token.
pub const DEV_USER_HEADER: &str = "X-Dev-User";

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    if parts.next().is_some() {
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
    /// An unresolvable reference leaves the state without a secret, so no
    /// JWT is issued or accepted.
    pub fn new(mut config: AuthConfig) -> Self {
        config.jwt_secret = match config.resolve_jwt_secret() {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("Ignoring JWT secret: {}", e);
                None
            }
        };

        let decoding_key = config
            .jwt_secret
            .as_ref()
            .map(|s| DecodingKey::from_secret(s.as_bytes()));

        Self {
            config: Arc::new(config),
            decoding_key,
        }
    }

    /// Check if dev mode is enabled.
    pub fn is_dev_mode(&self) -> bool {
        self.config.dev_mode
    }

    /// Get dev users.
    pub fn dev_users(&self) -> &[DevUser] {
        &self.config.dev_users
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Lifetime of issued tokens in seconds.
    pub fn token_ttl_secs(&self) -> i64 {
        self.config.token_ttl_hours.saturating_mul(3600)
    }

    /// Validate credentials in dev mode.
    ///
    /// The username may be the numeric user id or the email address.
    pub fn validate_dev_credentials(&self, username: &str, password: &str) -> Option<&DevUser> {
        if !self.config.dev_mode {
            return None;
        }

        let username = username.trim();
        self.config.dev_users.iter().find(|u| {
            (u.id.to_string() == username || u.email.eq_ignore_ascii_case(username))
                && u.verify_password(password)
        })
    }

    /// Validate a JWT token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        if self.config.dev_mode {
            if let Some(user_id) = token.strip_prefix("dev:") {
                return self.get_dev_user_claims(user_id);
            }
        }

        let decoding_key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
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

    /// Build claims for a dev-mode user id.
    ///
    /// Any positive numeric id is accepted; a matching configured dev user
    /// supplies the name and email.
    fn get_dev_user_claims(&self, user_id: &str) -> Result<Claims, AuthError> {
        let id: i64 = user_id
            .trim()
            .parse()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(AuthError::UserNotFound)?;

        let dev_user = self.config.dev_users.iter().find(|u| u.id == id);
        let now = Utc::now().timestamp();

        Ok(Claims {
            sub: id.to_string(),
            iss: Some("dev".to_string()),
            aud: None,
            exp: now.saturating_add(self.token_ttl_secs()),
            iat: Some(now),
            nbf: None,
            jti: None,
            email: dev_user.map(|u| u.email.clone()),
            name: dev_user.map(|u| u.name.clone()),
            preferred_username: None,
        })
    }

    /// Generate a token for a dev user.
    ///
    /// Without a JWT secret this is an opaque `dev:<id>` token, which only
    /// validates while dev mode is on.
    pub fn generate_dev_token(&self, user: &DevUser) -> Result<String, AuthError> {
        if self.config.jwt_secret.is_none() {
            return Ok(format!("dev:{}", user.id));
        }
        self.generate_token(user.id, Some(&user.email), &user.name)
    }

    /// Generate a JWT token for any user.
    pub fn generate_token(
        &self,
        user_id: i64,
        email: Option<&str>,
        name: &str,
    ) -> Result<String, AuthError> {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let secret = self
            .config
            .jwt_secret
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iss: Some(env!("CARGO_PKG_NAME").to_string()),
            aud: None,
            exp: now.saturating_add(self.token_ttl_secs()),
            iat: Some(now),
            nbf: None,
            jti: None,
            email: email.map(str::to_string),
            name: Some(name.to_string()),
            preferred_username: None,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    id: i64,
    /// User claims.
    pub claims: Claims,
}

impl CurrentUser {
    /// Build from validated claims. Fails when the subject is not a user id.
    pub fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let id = claims.user_id()?;
        Ok(Self { id, claims })
    }

    /// Get the user ID.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Get display name.
    pub fn display_name(&self) -> &str {
        self.claims.display_name()
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
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Authentication middleware.
///
/// Validates JWT tokens and injects `CurrentUser` into request extensions.
/// Supports multiple auth methods in priority order:
/// 1. Authorization: Bearer <token> header
/// 2. auth_token cookie
/// 3. X-Dev-User header (dev mode only)
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let cookie_token = req
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_header| token_from_cookie_header(cookie_header, AUTH_COOKIE_NAME));

    let claims = if let Some(header) = auth_header {
        let token = bearer_token_from_header(header)?;
        auth.validate_token(token)?
    } else if let Some(token) = cookie_token {
        auth.validate_token(token)?
    } else if auth.is_dev_mode() {
        if let Some(user_id) = req
            .headers()
            .get(DEV_USER_HEADER)
            .and_then(|h| h.to_str().ok())
        {
            debug!("Using dev user: {}", user_id);
            auth.validate_token(&format!("dev:{}", user_id))?
        } else {
            return Err(AuthError::MissingAuthHeader);
        }
    } else {
        return Err(AuthError::MissingAuthHeader);
    };

    let user = CurrentUser::from_claims(claims)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
