//! Admin HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::admin::{
    AdminListUsersQuery, PlatformStats, ReportKind, SetBanRequest, SetRoleRequest,
};
use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::models::PaginatedResponse;
use crate::state::AppState;
use crate::users::User;

/// GET /api/admin/users - Full user directory
pub async fn admin_list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AdminListUsersQuery>,
) -> Result<Json<PaginatedResponse<User>>, ApiError> {
    let page = state.admin_service.list_users(query).await?;
    Ok(Json(page))
}

/// POST /api/admin/users/:id/ban - Ban or unban an account
pub async fn admin_set_ban(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetBanRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.admin_service.set_ban(&admin, id, req).await?;
    Ok(Json(user))
}

/// POST /api/admin/users/:id/role - Promote or demote an account
pub async fn admin_set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.admin_service.set_role(&admin, id, req).await?;
    Ok(Json(user))
}

/// GET /api/admin/stats - Platform-wide aggregates
pub async fn admin_stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<PlatformStats>, ApiError> {
    let stats = state.report_service.stats().await?;
    Ok(Json(stats))
}

/// GET /api/admin/reports/:kind - CSV export (users, swaps or feedback)
pub async fn admin_report_csv(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ReportKind::parse(&kind)
        .ok_or_else(|| ApiError::InvalidArgument(format!("Unknown report kind: {kind}")))?;

    let csv = state.report_service.csv(kind).await?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", kind.filename()),
        ),
    ];
    Ok((headers, csv))
}
