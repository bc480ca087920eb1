//! Swap request HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::models::PaginatedResponse;
use crate::state::AppState;
use crate::swaps::{
    CompleteSwapRequest, CreateSwapRequest, ListSwapsQuery, RejectSwapRequest,
    ScheduleSwapRequest, SwapRequest,
};

/// POST /api/swaps - Send a swap request
pub async fn create_swap(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateSwapRequest>,
) -> Result<(StatusCode, Json<SwapRequest>), ApiError> {
    let swap = state.swap_service.create(&user, req).await?;
    Ok((StatusCode::CREATED, Json(swap)))
}

/// GET /api/swaps - The caller's swap requests
pub async fn list_swaps(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListSwapsQuery>,
) -> Result<Json<PaginatedResponse<SwapRequest>>, ApiError> {
    let page = state.swap_service.list_for_user(&user, query).await?;
    Ok(Json(page))
}

/// GET /api/swaps/:id - A single swap request, participants and admins only
pub async fn get_swap(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SwapRequest>, ApiError> {
    let swap = state.swap_service.get(&user, id).await?;
    Ok(Json(swap))
}

/// POST /api/swaps/:id/accept - Accept a pending request, receiver only
pub async fn accept_swap(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SwapRequest>, ApiError> {
    let swap = state.swap_service.accept(&user, id).await?;
    Ok(Json(swap))
}

/// POST /api/swaps/:id/reject - Decline a pending request, receiver only
pub async fn reject_swap(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectSwapRequest>,
) -> Result<Json<SwapRequest>, ApiError> {
    let swap = state.swap_service.reject(&user, id, req).await?;
    Ok(Json(swap))
}

/// DELETE /api/swaps/:id - Withdraw a pending request, requester only
pub async fn cancel_swap(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.swap_service.cancel(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/swaps/:id/complete - Confirm the caller's side of an accepted swap
pub async fn complete_swap(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteSwapRequest>,
) -> Result<Json<SwapRequest>, ApiError> {
    let swap = state.swap_service.complete(&user, id, req).await?;
    Ok(Json(swap))
}

/// POST /api/swaps/:id/schedule - Set session logistics on an accepted swap
pub async fn schedule_swap(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ScheduleSwapRequest>,
) -> Result<Json<SwapRequest>, ApiError> {
    let swap = state.swap_service.schedule(&user, id, req).await?;
    Ok(Json(swap))
}
