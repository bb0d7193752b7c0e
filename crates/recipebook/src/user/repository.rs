//! User repository for database operations.

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::models::User;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user with an already-hashed password.
    #[instrument(skip(self, password_hash))]
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let id = Uuid::new_v4().to_string();

        debug!("Creating user: {} ({})", email, id);

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.is_unique_violation() {
                bail!("Email '{}' is already registered.", email);
            }
        }
        result.context("Failed to insert user")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        Ok(user)
    }

    /// Get a user by email.
    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        Ok(user)
    }

    /// Check if an email is available.
    #[instrument(skip(self))]
    pub async fn is_email_available(&self, email: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email availability")?;

        Ok(count.0 == 0)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_repo() -> UserRepository {
        let db = Database::in_memory().await.unwrap();
        UserRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_repo().await;

        let user = repo.create("cook@example.com", "$2b$04$digest").await.unwrap();
        assert_eq!(user.email, "cook@example.com");
        assert_eq!(user.password_hash, "$2b$04$digest");
        assert!(Uuid::parse_str(&user.id).is_ok());

        let fetched = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, user.email);

        let by_email = repo.get_by_email("cook@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = setup_repo().await;
        repo.create("cook@example.com", "digest-1").await.unwrap();

        let err = repo
            .create("cook@example.com", "digest-2")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_is_email_available() {
        let repo = setup_repo().await;
        assert!(repo.is_email_available("cook@example.com").await.unwrap());

        repo.create("cook@example.com", "digest").await.unwrap();
        assert!(!repo.is_email_available("cook@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let repo = setup_repo().await;
        assert!(repo.get("nope").await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
