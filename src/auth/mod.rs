//! Authentication module for Skill Swap
//!
//! Provides email/password authentication:
//! - bcrypt password hashing
//! - JWT access token generation and validation
//! - Token-to-actor resolution with ban enforcement

mod jwt;
mod password;
mod service;

pub use jwt::{generate_access_token, get_user_id_from_claims, verify_token, Claims};
pub use password::{hash_password, verify_password};
pub use service::{AuthResponse, AuthService, LoginRequest, RegisterRequest};
