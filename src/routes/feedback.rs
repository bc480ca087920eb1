//! Feedback route definitions

use axum::{
    routing::{delete, post, put},
    Router,
};

use crate::handlers::feedback;
use crate::state::AppState;

pub fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route("/api/feedback", post(feedback::create_feedback))
        .route("/api/feedback/:id", put(feedback::update_feedback))
        .route("/api/feedback/:id", delete(feedback::delete_feedback))
}
