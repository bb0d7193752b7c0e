//! Authentication module.
//!
//! Provides:
//! - bcrypt password hashing
//! - HS256 access/refresh tokens with separate secrets
//! - cookie-carried sessions and the middleware that gates protected routes

mod claims;
mod config;
mod cookies;
mod error;
mod middleware;
mod password;
mod tokens;

pub use claims::{Claims, TokenKind, TokenPair};
pub use config::{AuthConfig, ConfigValidationError, DeploymentMode, ResolvedSecrets};
pub use cookies::{
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, SessionCookies, SessionHeaders, read_cookie,
};
pub use error::{AuthError, AuthErrorResponse, TokenError};
pub use middleware::{AuthState, CurrentUser, auth_middleware};
pub use password::{MAX_PASSWORD_BYTES, PasswordHasher};
pub use tokens::{Clock, FixedClock, SystemClock, TokenService};
