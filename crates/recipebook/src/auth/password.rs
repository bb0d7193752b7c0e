//! Password hashing with bcrypt.

use super::error::AuthError;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hashes and verifies passwords at a fixed bcrypt cost.
///
/// Holds a precomputed digest so that logins for unknown emails can burn
/// the same amount of CPU as a real verification. Inputs longer than
/// [`MAX_PASSWORD_BYTES`] are never truncated.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_digest: String,
}

impl PasswordHasher {
    /// Create a hasher. Fails if `cost` is outside bcrypt's 4..=31 range.
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let dummy_digest = bcrypt::non_truncating_hash("recipebook-timing-equaliser", cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt setup failed: {e}")))?;
        Ok(Self { cost, dummy_digest })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Produce a salted digest. Two calls with the same input differ.
    ///
    /// Fails for input over [`MAX_PASSWORD_BYTES`].
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::non_truncating_hash(plaintext, self.cost)
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// `Ok(false)` on mismatch, `Err` only when `digest` is not a bcrypt digest.
    pub fn verify(&self, digest: &str, plaintext: &str) -> Result<bool, AuthError> {
        // Nothing over the limit was ever hashed, so it cannot match.
        if plaintext.len() > MAX_PASSWORD_BYTES {
            self.verify_dummy(plaintext);
            return Ok(false);
        }
        bcrypt::non_truncating_verify(plaintext, digest)
            .map_err(|e| AuthError::MalformedDigest(e.to_string()))
    }

    /// Run a verification whose result is discarded.
    pub fn verify_dummy(&self, plaintext: &str) {
        let input = truncate_to_limit(plaintext);
        let _ = bcrypt::non_truncating_verify(input, &self.dummy_digest);
    }
}

fn truncate_to_limit(plaintext: &str) -> &str {
    if plaintext.len() <= MAX_PASSWORD_BYTES {
        return plaintext;
    }
    let mut end = MAX_PASSWORD_BYTES;
    while !plaintext.is_char_boundary(end) {
        end -= 1;
    }
    &plaintext[..end]
}
