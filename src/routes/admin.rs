//! Admin route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::admin;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(admin::admin_list_users))
        .route("/api/admin/users/:id/ban", post(admin::admin_set_ban))
        .route("/api/admin/users/:id/role", post(admin::admin_set_role))
        .route("/api/admin/stats", get(admin::admin_stats))
        .route("/api/admin/reports/:kind", get(admin::admin_report_csv))
}
