//! User profile HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{CurrentUser, OptionalUser};
use crate::models::PaginatedResponse;
use crate::state::AppState;
use crate::users::{BrowseUsersQuery, PublicProfile, UpdateProfileRequest, UserResponse};

/// GET /api/users - Browse public profiles
pub async fn browse_users(
    State(state): State<AppState>,
    Query(query): Query<BrowseUsersQuery>,
) -> Result<Json<PaginatedResponse<PublicProfile>>, ApiError> {
    let page = state.user_service.browse(query).await?;
    Ok(Json(page))
}

/// GET /api/users/:id - A single profile. Private profiles are visible
/// to their owner and admins only.
pub async fn get_profile(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicProfile>, ApiError> {
    let profile = state.user_service.get_profile(id, viewer.as_ref()).await?;
    Ok(Json(profile))
}

/// PUT /api/users/me - Update the caller's own profile
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state.user_service.update_profile(user.id, req).await?;
    Ok(Json(updated.into()))
}
