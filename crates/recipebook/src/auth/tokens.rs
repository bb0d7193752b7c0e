//! Signed session tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate secrets.
//! Verification accepts HS256 only and compares `exp` against an injected
//! clock with zero leeway.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use tracing::debug;

use super::claims::{Claims, TokenKind, TokenPair};
use super::config::{AuthConfig, ResolvedSecrets};
use super::error::{AuthError, TokenError};

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secrets: &ResolvedSecrets, config: &AuthConfig) -> Self {
        Self {
            access: SigningKeys::from_secret(&secrets.access),
            refresh: SigningKeys::from_secret(&secrets.refresh),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
            issuer: config.issuer.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Mint an access/refresh pair sharing the same subject, email and
    /// issue time.
    pub fn generate_tokens(&self, subject: &str, email: &str) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        Ok(TokenPair {
            access_token: self.sign(TokenKind::Access, subject, email, now)?,
            refresh_token: self.sign(TokenKind::Refresh, subject, email, now)?,
        })
    }

    pub fn issue_access_token(&self, subject: &str, email: &str) -> Result<String, AuthError> {
        self.sign(TokenKind::Access, subject, email, self.clock.now())
    }

    pub fn issue_refresh_token(&self, subject: &str, email: &str) -> Result<String, AuthError> {
        self.sign(TokenKind::Refresh, subject, email, self.clock.now())
    }

    pub fn verify_access_token(&self, raw: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Access, raw)
    }

    pub fn verify_refresh_token(&self, raw: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Refresh, raw)
    }

    /// Exchange a valid refresh token for a fresh pair.
    ///
    /// The presented refresh token is not revoked and stays usable until it
    /// expires.
    pub fn refresh(&self, raw_refresh: &str) -> Result<TokenPair, AuthError> {
        let claims = self.verify_refresh_token(raw_refresh)?;
        debug!(user_id = %claims.sub, "refreshing session");
        self.generate_tokens(&claims.sub, &claims.email)
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn ttl(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }

    fn sign(
        &self,
        kind: TokenKind,
        subject: &str,
        email: &str,
        now: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now.saturating_add(self.ttl(kind)),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(kind).encoding,
        )
        .map_err(|e| AuthError::Internal(format!("failed to sign {kind} token: {e}")))
    }

    fn verify(&self, kind: TokenKind, raw: &str) -> Result<Claims, TokenError> {
        let alg = header_algorithm(raw)?;
        if alg != "HS256" {
            return Err(TokenError::UnexpectedAlgorithm(alg));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iss"]);

        let data = decode::<Claims>(raw, &self.keys(kind).decoding, &validation)?;
        let claims = data.claims;

        if self.clock.now() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Read `alg` from the token header without trusting anything else in it.
fn header_algorithm(raw: &str) -> Result<String, TokenError> {
    let mut segments = raw.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed(
            "expected three dot-separated segments".to_string(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::Malformed(format!("header is not base64url: {e}")))?;
    let header: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("header is not valid JSON: {e}")))?;

    Ok(header.alg)
}
