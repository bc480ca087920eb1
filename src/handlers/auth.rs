//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::users::UserResponse;

/// POST /api/auth/register - Create an account and issue a token
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login - Verify credentials and issue a token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state.auth_service.login(req).await?;
    Ok(Json(response))
}

/// GET /api/auth/me - The authenticated account
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}
