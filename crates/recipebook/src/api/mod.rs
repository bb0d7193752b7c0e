//! HTTP API.

mod error;
mod handlers;
mod response;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{CredentialsRequest, HealthResponse};
pub use response::ApiResponse;
pub use routes::{DEFAULT_MAX_UPLOAD_SIZE_MB, create_router, create_router_with_config};
pub use state::AppState;
