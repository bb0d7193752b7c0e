//! API request handlers, organized by domain:
//! - `auth`: registration, login, token refresh, logout, current user
//! - `recipes`: recipe listing and creation
//! - `health`: liveness check

mod auth;
mod health;
mod recipes;

pub use auth::{CredentialsRequest, login, logout, me, refresh_token, register};
pub use health::{HealthResponse, health};
pub use recipes::{create_recipe, list_recipes};
