//! Feedback HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::feedback::{
    CreateFeedbackRequest, Feedback, FeedbackEntry, ListFeedbackQuery, UpdateFeedbackRequest,
};
use crate::middleware::CurrentUser;
use crate::models::PaginatedResponse;
use crate::state::AppState;

/// POST /api/feedback - Rate the other participant of a completed swap
pub async fn create_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateFeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    let feedback = state.feedback_service.create(&user, req).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// PUT /api/feedback/:id - Edit feedback, author only
pub async fn update_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFeedbackRequest>,
) -> Result<Json<Feedback>, ApiError> {
    let feedback = state.feedback_service.update(&user, id, req).await?;
    Ok(Json(feedback))
}

/// DELETE /api/feedback/:id - Remove feedback, author only
pub async fn delete_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.feedback_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/:id/feedback - Public feedback received by a user
pub async fn list_user_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListFeedbackQuery>,
) -> Result<Json<PaginatedResponse<FeedbackEntry>>, ApiError> {
    let page = state.feedback_service.list_for_user(id, query).await?;
    Ok(Json(page))
}
