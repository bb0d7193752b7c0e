//! Recipebook: a personal recipe-bookmark API.
//!
//! Users register with email and password, log in to receive cookie-carried
//! HS256 session tokens, and keep a private list of recipe bookmarks
//! (name, cookbook, page and an optional photo).

pub mod api;
pub mod auth;
pub mod db;
pub mod recipe;
pub mod user;
