//! Recipe repository for database operations.

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::models::{NewRecipe, Recipe};

/// Repository for recipe database operations.
///
/// Every query is scoped to an owner; there is no way to read another
/// user's recipes through this type.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List a user's recipes, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Recipe>> {
        let recipes = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, name, cookbook, page_number, image, created_at, updated_at
            FROM recipes
            WHERE user_id = ?
            ORDER BY created_at DESC, name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recipes")?;

        Ok(recipes)
    }

    /// Whether the user already has a recipe with this name.
    #[instrument(skip(self))]
    pub async fn exists_for_user(&self, user_id: &str, name: &str) -> Result<bool> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE user_id = ? AND name = ?")
                .bind(user_id)
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check recipe name")?;

        Ok(count.0 > 0)
    }

    /// Create a recipe owned by `user_id`.
    #[instrument(skip(self, recipe), fields(name = %recipe.name))]
    pub async fn create(&self, user_id: &str, recipe: NewRecipe) -> Result<Recipe> {
        let id = Uuid::new_v4().to_string();

        debug!("Creating recipe {} for user {}", id, user_id);

        let result = sqlx::query(
            r#"
            INSERT INTO recipes (id, user_id, name, cookbook, page_number, image)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&recipe.name)
        .bind(&recipe.cookbook)
        .bind(recipe.page_number)
        .bind(&recipe.image)
        .execute(&self.pool)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.is_unique_violation() {
                bail!("Recipe '{}' already exists.", recipe.name);
            }
        }
        result.context("Failed to insert recipe")?;

        self.get(user_id, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Recipe not found after creation"))
    }

    /// Get one of a user's recipes by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, name, cookbook, page_number, image, created_at, updated_at
            FROM recipes
            WHERE user_id = ? AND id = ?
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch recipe")?;

        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::user::UserRepository;

    async fn setup() -> (RecipeRepository, String, String) {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(db.pool().clone());
        let alice = users.create("alice@example.com", "digest").await.unwrap();
        let bob = users.create("bob@example.com", "digest").await.unwrap();
        (RecipeRepository::new(db.pool().clone()), alice.id, bob.id)
    }

    fn pancakes() -> NewRecipe {
        NewRecipe {
            name: "Pancakes".to_string(),
            cookbook: "Breakfast Bible".to_string(),
            page_number: 42,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (repo, alice, _) = setup().await;

        let recipe = repo.create(&alice, pancakes()).await.unwrap();
        assert_eq!(recipe.user_id, alice);
        assert_eq!(recipe.page_number, 42);

        let list = repo.list_for_user(&alice).await.unwrap();
        assert_eq!(list, vec![recipe]);
    }

    #[tokio::test]
    async fn test_recipes_are_scoped_to_owner() {
        let (repo, alice, bob) = setup().await;
        let recipe = repo.create(&alice, pancakes()).await.unwrap();

        assert!(repo.list_for_user(&bob).await.unwrap().is_empty());
        assert!(repo.get(&bob, &recipe.id).await.unwrap().is_none());

        // Same name is fine for a different owner.
        repo.create(&bob, pancakes()).await.unwrap();
        assert!(repo.exists_for_user(&bob, "Pancakes").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_name_for_same_owner() {
        let (repo, alice, _) = setup().await;
        repo.create(&alice, pancakes()).await.unwrap();

        let err = repo.create(&alice, pancakes()).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_unknown_owner_is_rejected() {
        let (repo, _, _) = setup().await;
        assert!(repo.create("ghost", pancakes()).await.is_err());
    }
}
