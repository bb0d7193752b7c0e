//! Registration, login, refresh, logout and identity handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::response::ApiResponse;
use crate::api::state::AppState;
use crate::auth::{AuthError, CurrentUser, REFRESH_TOKEN_COOKIE, read_cookie};
use crate::user::{CreateUserRequest, UserInfo};

/// Email/password body shared by register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    fn require_fields(&self) -> ApiResult<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::validation("email and password are required"));
        }
        Ok(())
    }
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

/// Register a new user.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<UserInfo>>> {
    let request = parse_json(payload)?;
    request.require_fields()?;

    let user = state
        .users
        .register(CreateUserRequest {
            email: request.email,
            password: request.password,
        })
        .await?;

    info!(user_id = %user.id, "User registered successfully");

    Ok(Json(
        ApiResponse::data(UserInfo::from(user)).with_message("user created"),
    ))
}

/// Login endpoint. Sets both session cookies on success.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = parse_json(payload)?;
    request.require_fields()?;

    let user = state
        .users
        .verify_credentials(&request.email, &request.password)
        .await?
        .ok_or_else(|| {
            warn!("Failed login attempt");
            ApiError::InvalidCredentials
        })?;

    let pair = state.auth.tokens().generate_tokens(&user.id, &user.email)?;

    info!(user_id = %user.id, "User logged in successfully");

    Ok((
        state.auth.cookies().issue(&pair),
        Json(ApiResponse::message("success")),
    ))
}

/// Exchange the refresh cookie for a new pair of session cookies.
#[instrument(skip(state, headers))]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let raw = read_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .ok_or(AuthError::MissingSession)?
        .trim();
    if raw.is_empty() {
        return Err(AuthError::EmptyToken.into());
    }

    let pair = state.auth.tokens().refresh(raw).map_err(|e| {
        if let AuthError::InvalidToken(kind) = &e {
            warn!(reason = kind.kind(), "Refresh token rejected");
        }
        e
    })?;

    Ok((
        state.auth.cookies().issue(&pair),
        Json(ApiResponse::message("success")),
    ))
}

/// Logout endpoint. Clears both session cookies; never fails.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        state.auth.cookies().clear(),
        Json(ApiResponse::message("logged out")),
    )
}

/// Return the authenticated user's record.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<ApiResponse<UserInfo>>> {
    let record = state
        .users
        .get_user(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(ApiResponse::data(UserInfo::from(record))))
}
