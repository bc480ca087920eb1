//! User route definitions

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::{feedback, users};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(users::browse_users))
        .route("/api/users/me", put(users::update_me))
        .route("/api/users/:id", get(users::get_profile))
        .route("/api/users/:id/feedback", get(feedback::list_user_feedback))
}
