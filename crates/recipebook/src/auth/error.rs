//! Authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Why a signed token was rejected.
///
/// The `Malformed` detail is for logs only and never shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature does not match the expected secret.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// Header names an algorithm other than HS256 (including `none`).
    #[error("unexpected signing algorithm")]
    UnexpectedAlgorithm(String),

    /// `exp` is at or before the current time.
    #[error("token has expired")]
    Expired,

    /// Structurally broken token or missing claims.
    #[error("token is malformed")]
    Malformed(String),
}

impl TokenError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::UnexpectedAlgorithm(_) => "unexpected_algorithm",
            TokenError::Expired => "expired",
            TokenError::Malformed(_) => "malformed",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => TokenError::UnexpectedAlgorithm("unknown".to_string()),
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session cookie on the request.
    #[error("missing session")]
    MissingSession,

    /// Session cookie present but blank.
    #[error("empty token")]
    EmptyToken,

    /// Token failed verification.
    #[error("{0}")]
    InvalidToken(#[from] TokenError),

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Stored password digest could not be parsed.
    #[error("malformed password digest: {0}")]
    MalformedDigest(String),

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::MissingSession | AuthError::EmptyToken | AuthError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AuthError::InvalidCredentials => (StatusCode::BAD_REQUEST, "invalid_credentials"),
            AuthError::MalformedDigest(_) | AuthError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    /// Message safe to show to clients.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::MalformedDigest(_) | AuthError::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!("auth error: {}", self);
        }

        let body = Json(AuthErrorResponse {
            error: error_code.to_string(),
            message: self.public_message(),
        });

        (status, body).into_response()
    }
}
