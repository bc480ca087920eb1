//! Swap request route definitions

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::swaps;
use crate::state::AppState;

pub fn swap_routes() -> Router<AppState> {
    Router::new()
        .route("/api/swaps", post(swaps::create_swap))
        .route("/api/swaps", get(swaps::list_swaps))
        .route("/api/swaps/:id", get(swaps::get_swap))
        .route("/api/swaps/:id", delete(swaps::cancel_swap))
        .route("/api/swaps/:id/accept", post(swaps::accept_swap))
        .route("/api/swaps/:id/reject", post(swaps::reject_swap))
        .route("/api/swaps/:id/complete", post(swaps::complete_swap))
        .route("/api/swaps/:id/schedule", post(swaps::schedule_swap))
}
