//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use log::{debug, warn};
use std::sync::Arc;

use super::claims::Claims;
use super::config::{AuthConfig, ConfigValidationError};
use super::cookies::{ACCESS_TOKEN_COOKIE, SessionCookies, read_cookie};
use super::error::AuthError;
use super::tokens::{Clock, TokenService};

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    tokens: TokenService,
    cookies: SessionCookies,
}

impl AuthState {
    /// Create new auth state from config.
    /// Validates the config and resolves both signing secrets.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigValidationError> {
        let secrets = config.resolve_secrets()?;
        let tokens = TokenService::new(&secrets, &config);
        let cookies = SessionCookies::from_config(&config);

        Ok(Self {
            config: Arc::new(config),
            tokens,
            cookies,
        })
    }

    /// Replace the token service's time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tokens = self.tokens.with_clock(clock);
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

/// Extract authentication from request.
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
            .ok_or(AuthError::MissingSession)
    }
}

/// Authentication middleware.
///
/// Reads the access token cookie, verifies it and injects `CurrentUser`
/// into request extensions. Rejected requests never reach the handler.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = {
        let raw = read_cookie(req.headers(), ACCESS_TOKEN_COOKIE)
            .ok_or(AuthError::MissingSession)?;

        let token = raw.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        auth.tokens().verify_access_token(token).map_err(|e| {
            warn!("Access token rejected ({}): {:?}", e.kind(), e);
            AuthError::InvalidToken(e)
        })?
    };

    debug!("Authenticated user {}", claims.sub);
    req.extensions_mut().insert(CurrentUser::from(claims));

    Ok(next.run(req).await)
}
