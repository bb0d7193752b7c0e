//! User service for business logic.

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use super::models::{CreateUserRequest, User};
use super::repository::UserRepository;
use crate::auth::{MAX_PASSWORD_BYTES, PasswordHasher};

/// Password length bounds, counted in characters. The encoded password
/// must also fit in [`MAX_PASSWORD_BYTES`].
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 56;

/// Service for user management operations.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: UserRepository,
    passwords: PasswordHasher,
}

impl UserService {
    /// Create a new user service.
    pub fn new(repo: UserRepository, passwords: PasswordHasher) -> Self {
        Self { repo, passwords }
    }

    /// Register a new user with validation.
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: CreateUserRequest) -> Result<User> {
        let email = normalize_email(&request.email);

        if !is_valid_email(&email) {
            bail!("Invalid email format.");
        }

        let password_len = request.password.chars().count();
        if password_len < MIN_PASSWORD_LENGTH {
            bail!("Password must be at least {MIN_PASSWORD_LENGTH} characters.");
        }
        if password_len > MAX_PASSWORD_LENGTH {
            bail!("Password must be at most {MAX_PASSWORD_LENGTH} characters.");
        }
        if request.password.len() > MAX_PASSWORD_BYTES {
            bail!("Password must be at most {MAX_PASSWORD_BYTES} bytes when UTF-8 encoded.");
        }

        if !self.repo.is_email_available(&email).await? {
            bail!("Email '{}' is already registered.", email);
        }

        let passwords = self.passwords.clone();
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .context("Password hashing task failed")??;
        let user = self.repo.create(&email, &password_hash).await?;
        info!(user_id = %user.id, "Registered new user");

        Ok(user)
    }

    /// Verify user credentials.
    ///
    /// Returns `None` for an unknown email and for a wrong password alike.
    /// Unknown emails still pay for one bcrypt verification.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = normalize_email(email);

        let user = self.repo.get_by_email(&email).await?;

        let passwords = self.passwords.clone();
        let password = password.to_string();
        let digest = user.as_ref().map(|u| u.password_hash.clone());
        let matched = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => passwords.verify(&digest, &password),
            None => {
                passwords.verify_dummy(&password);
                Ok(false)
            }
        })
        .await
        .context("Password verification task failed")??;

        Ok(user.filter(|_| matched))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.repo.get(id).await
    }
}

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_service() -> UserService {
        let db = Database::in_memory().await.unwrap();
        UserService::new(
            UserRepository::new(db.pool().clone()),
            PasswordHasher::new(4).unwrap(),
        )
    }

    fn request(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name+tag@sub.example.org"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@"));
        assert!(!is_valid_email("test@example"));
        assert!(!is_valid_email("test@.example.com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let service = setup_service().await;
        let user = service
            .register(request(" Cook@Example.com ", "hunter22"))
            .await
            .unwrap();

        assert_eq!(user.email, "cook@example.com");
        assert_ne!(user.password_hash, "hunter22");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = setup_service().await;

        let err = service.register(request("not-an-email", "hunter22")).await;
        assert!(err.unwrap_err().to_string().contains("Invalid email"));

        let err = service.register(request("cook@example.com", "12345")).await;
        assert!(err.unwrap_err().to_string().contains("at least 6"));

        let long = "x".repeat(57);
        let err = service.register(request("cook@example.com", &long)).await;
        assert!(err.unwrap_err().to_string().contains("at most 56"));

        // 38 characters but 74 bytes.
        let multibyte = format!("{}aa", "é".repeat(36));
        let err = service.register(request("cook@example.com", &multibyte)).await;
        assert!(err.unwrap_err().to_string().contains("at most 72 bytes"));
    }

    #[tokio::test]
    async fn test_multibyte_passwords_are_distinguished() {
        let service = setup_service().await;
        let password = format!("{}aa", "é".repeat(35));
        assert_eq!(password.len(), 72);
        service
            .register(request("cook@example.com", &password))
            .await
            .unwrap();

        let other = format!("{}ab", "é".repeat(35));
        let wrong = service
            .verify_credentials("cook@example.com", &other)
            .await
            .unwrap();
        assert!(wrong.is_none());

        let longer = format!("{password}a");
        let wrong = service
            .verify_credentials("cook@example.com", &longer)
            .await
            .unwrap();
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = setup_service().await;
        service
            .register(request("cook@example.com", "hunter22"))
            .await
            .unwrap();

        let err = service
            .register(request("COOK@example.com", "another1"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let service = setup_service().await;
        let user = service
            .register(request("cook@example.com", "hunter22"))
            .await
            .unwrap();

        let found = service
            .verify_credentials("cook@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let wrong = service
            .verify_credentials("cook@example.com", "hunter23")
            .await
            .unwrap();
        assert!(wrong.is_none());

        let unknown = service
            .verify_credentials("nobody@example.com", "hunter22")
            .await
            .unwrap();
        assert!(unknown.is_none());
    }
}
