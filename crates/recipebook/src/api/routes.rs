//! API route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers;
use super::state::AppState;
use crate::auth::auth_middleware;

/// Default maximum request body size in megabytes.
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 10;

/// Create the application router with the default upload limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, DEFAULT_MAX_UPLOAD_SIZE_MB)
}

/// Create the application router with configurable max upload size.
pub fn create_router_with_config(state: AppState, max_upload_size_mb: usize) -> Router {
    let cors = build_cors_layer(&state);
    let max_body_size = max_upload_size_mb * 1024 * 1024;

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();
    let public_files = ServeDir::new(state.public_dir());

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::me))
        .route(
            "/api/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh-token", post(handlers::refresh_token))
        .route("/auth/logout", post(handlers::logout));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .nest_service("/public", public_files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(trace_layer)
        .layer(cors)
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins = state.auth.allowed_origins();

    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        // Cookies carry the session, so a wildcard origin is never acceptable.
        tracing::warn!("CORS: No valid origins configured, denying all cross-origin requests");
        CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}
