//! API handlers for the Skill Swap backend

pub mod admin;
pub mod auth;
pub mod feedback;
pub mod swaps;
pub mod users;
