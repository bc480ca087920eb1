//! User domain module
//!
//! Contains the user model, profile management, and discovery service.

mod model;
mod service;

pub use model::*;
pub use service::UserService;
