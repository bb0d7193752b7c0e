//! Authentication configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Minimum accepted length for a signing secret.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default access token lifetime (10 minutes).
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 10 * 60;

/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Upper bound for either token lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Deployment mode. Controls the `Secure` cookie flag and how strictly
/// missing secrets are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    Development,
    #[default]
    Production,
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Development => write!(f, "development"),
            DeploymentMode::Production => write!(f, "production"),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Deployment mode.
    pub mode: DeploymentMode,

    /// HS256 secret for access tokens. Supports `env:VAR_NAME`.
    /// REQUIRED in production.
    pub access_token_secret: Option<String>,

    /// HS256 secret for refresh tokens. Supports `env:VAR_NAME`.
    /// REQUIRED in production, and must differ from the access secret.
    pub refresh_token_secret: Option<String>,

    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds.
    pub refresh_token_ttl_secs: i64,

    /// Value of the `iss` claim.
    pub issuer: String,

    /// bcrypt work factor for password digests.
    pub bcrypt_cost: u32,

    /// Allowed CORS origins. If empty, cross-origin requests are not allowed.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: DeploymentMode::Production,
            // No default secrets - must be explicitly configured
            access_token_secret: None,
            refresh_token_secret: None,
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            issuer: "recipebook".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// Signing secrets after `env:` expansion and validation.
///
/// Built once at startup and handed to the token service.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Whether cookies should carry the `Secure` flag.
    pub fn is_production(&self) -> bool {
        self.mode == DeploymentMode::Production
    }

    /// Validate the configuration without keeping the resolved secrets.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.resolve_secrets().map(|_| ())
    }

    /// Validate the configuration and resolve both signing secrets.
    ///
    /// In development mode a missing secret is replaced by a random one,
    /// which means sessions do not survive a restart.
    pub fn resolve_secrets(&self) -> Result<ResolvedSecrets, ConfigValidationError> {
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.access_token_ttl_secs) {
            return Err(ConfigValidationError::InvalidTtl("access_token_ttl_secs"));
        }
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.refresh_token_ttl_secs) {
            return Err(ConfigValidationError::InvalidTtl("refresh_token_ttl_secs"));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigValidationError::InvalidBcryptCost(self.bcrypt_cost));
        }

        let access = self.resolve_one(SecretSlot::Access)?;
        let refresh = self.resolve_one(SecretSlot::Refresh)?;

        if access == refresh {
            return Err(ConfigValidationError::SecretsNotDistinct);
        }

        Ok(ResolvedSecrets { access, refresh })
    }

    fn resolve_one(&self, slot: SecretSlot) -> Result<String, ConfigValidationError> {
        let configured = match slot {
            SecretSlot::Access => &self.access_token_secret,
            SecretSlot::Refresh => &self.refresh_token_secret,
        };

        match resolve_secret(configured)? {
            Some(secret) => {
                if secret.len() < MIN_SECRET_LENGTH {
                    return Err(ConfigValidationError::SecretTooShort(slot.name()));
                }
                Ok(secret)
            }
            None if self.is_production() => {
                Err(ConfigValidationError::MissingSecret(slot.name()))
            }
            None => {
                warn!(
                    secret = slot.name(),
                    "No secret configured, generated an ephemeral one for development"
                );
                Ok(Self::generate_secret())
            }
        }
    }

    /// Generate a secure random secret using a cryptographically secure RNG.
    pub fn generate_secret() -> String {
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

#[derive(Debug, Clone, Copy)]
enum SecretSlot {
    Access,
    Refresh,
}

impl SecretSlot {
    fn name(self) -> &'static str {
        match self {
            SecretSlot::Access => "access_token_secret",
            SecretSlot::Refresh => "refresh_token_secret",
        }
    }
}

/// Resolve a configured secret, expanding `env:VAR_NAME` syntax.
/// Blank values count as not configured.
fn resolve_secret(value: &Option<String>) -> Result<Option<String>, ConfigValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            if let Some(var_name) = value.strip_prefix("env:") {
                match std::env::var(var_name) {
                    Ok(secret) if !secret.trim().is_empty() => Ok(Some(secret)),
                    Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                    Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                }
            } else {
                Ok(Some(value.to_string()))
            }
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// A signing secret is required in production mode.
    MissingSecret(&'static str),
    /// A signing secret is shorter than [`MIN_SECRET_LENGTH`].
    SecretTooShort(&'static str),
    /// Access and refresh secrets are identical.
    SecretsNotDistinct,
    /// A token lifetime is zero or negative.
    InvalidTtl(&'static str),
    /// bcrypt cost outside 4..=31.
    InvalidBcryptCost(u32),
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    EnvVarEmpty(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSecret(name) => {
                write!(
                    f,
                    "auth.{name} is required in production mode. Set RECIPEBOOK__AUTH__{} or {name} in config.",
                    name.to_uppercase()
                )
            }
            Self::SecretTooShort(name) => {
                write!(
                    f,
                    "auth.{name} must be at least {MIN_SECRET_LENGTH} characters long."
                )
            }
            Self::SecretsNotDistinct => {
                write!(
                    f,
                    "auth.access_token_secret and auth.refresh_token_secret must be different."
                )
            }
            Self::InvalidTtl(name) => write!(
                f,
                "auth.{name} must be between 1 and {MAX_TOKEN_TTL_SECS} seconds."
            ),
            Self::InvalidBcryptCost(cost) => {
                write!(f, "auth.bcrypt_cost must be between 4 and 31 (got {cost}).")
            }
            Self::EnvVarNotFound(var) => {
                write!(
                    f,
                    "Environment variable '{}' not found (referenced via env:{} in config).",
                    var, var
                )
            }
            Self::EnvVarEmpty(var) => {
                write!(
                    f,
                    "Environment variable '{}' is empty (referenced via env:{} in config).",
                    var, var
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}
