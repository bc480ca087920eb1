//! Route definitions for the Skill Swap API

mod admin;
mod auth;
mod feedback;
mod swaps;
mod users;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use feedback::feedback_routes;
pub use swaps::swap_routes;
pub use users::user_routes;
