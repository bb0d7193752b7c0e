//! Recipe bookmarks owned by users.

mod models;
mod repository;

pub use models::{NewRecipe, Recipe};
pub use repository::RecipeRepository;
