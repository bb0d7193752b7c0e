//! Application state shared across handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::AuthState;
use crate::recipe::RecipeRepository;
use crate::user::UserService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token service, cookie policy and auth config.
    pub auth: AuthState,
    /// User registration and credential checks.
    pub users: UserService,
    /// Recipe persistence.
    pub recipes: RecipeRepository,
    /// Root of the statically served `/public` tree. Uploaded images land
    /// in its `images/` subdirectory.
    public_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(
        auth: AuthState,
        users: UserService,
        recipes: RecipeRepository,
        public_dir: PathBuf,
    ) -> Self {
        Self {
            auth,
            users,
            recipes,
            public_dir: Arc::new(public_dir),
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Directory recipe images are written to.
    pub fn images_dir(&self) -> PathBuf {
        self.public_dir.join("images")
    }
}
