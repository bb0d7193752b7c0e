//! Token claims.

use serde::{Deserialize, Serialize};

/// Which of the two token classes a value belongs to.
///
/// Each class is signed with its own secret, so a token of one class never
/// verifies as the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// User's email.
    pub email: String,

    /// Issuer.
    pub iss: String,

    /// Issued at (Unix seconds).
    pub iat: i64,

    /// Expiration time (Unix seconds).
    pub exp: i64,
}

impl Claims {
    /// User ID (alias for `sub`).
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// An access token and a refresh token minted together.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_roundtrip_field_names() {
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "cook@example.com".to_string(),
            iss: "recipebook".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_000_600,
        };

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["sub"], "user-1");
        assert_eq!(value["email"], "cook@example.com");
        assert_eq!(value["exp"], 1_700_000_600);
        assert_eq!(claims.user_id(), "user-1");
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair = TokenPair {
            access_token: "aaa.bbb.ccc".to_string(),
            refresh_token: "ddd.eee.fff".to_string(),
        };
        let debug = format!("{pair:?}");
        assert!(!debug.contains("aaa.bbb.ccc"));
        assert!(!debug.contains("ddd.eee.fff"));
    }
}
