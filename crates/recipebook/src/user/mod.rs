//! User management module.
//!
//! Persistence and business rules for registered users:
//! - `models`: database entity and request/response types
//! - `repository`: SQLite access
//! - `service`: registration and credential checks

mod models;
mod repository;
mod service;

pub use models::{CreateUserRequest, User, UserInfo};
pub use repository::UserRepository;
pub use service::{
    MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, UserService, is_valid_email, normalize_email,
};
