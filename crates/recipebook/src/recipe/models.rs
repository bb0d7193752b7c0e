//! Recipe data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A bookmarked recipe: where to find it in which cookbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub cookbook: String,
    #[serde(rename = "pagenumber")]
    pub page_number: i64,
    /// Public URL path of the uploaded image, if any.
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Validated input for a new recipe.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub cookbook: String,
    pub page_number: i64,
    pub image: Option<String>,
}
