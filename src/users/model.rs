//! User models and profile data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// User account model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub location: Option<String>,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub availability: Availability,
    pub is_public: bool,
    pub role: UserRole,
    pub is_banned: bool,
    pub banned_at: Option<DateTime<Utc>>,
    pub ban_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may act as an administrator
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

/// User availability for swap sessions
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "availability", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Busy,
    Unavailable,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Busy => "busy",
            Availability::Unavailable => "unavailable",
        }
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// User data returned to the account owner
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub availability: Availability,
    pub is_public: bool,
    pub role: UserRole,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            location: user.location,
            skills_offered: user.skills_offered,
            skills_wanted: user.skills_wanted,
            availability: user.availability,
            is_public: user.is_public,
            role: user.role,
            is_banned: user.is_banned,
            created_at: user.created_at,
        }
    }
}

/// Public profile view with aggregated rating
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub availability: Availability,
    pub rating: RatingSummary,
    pub member_since: DateTime<Utc>,
}

/// Aggregated feedback rating for a user
#[derive(Debug, Serialize, Default)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

/// Request body for updating the caller's profile.
/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub skills_offered: Option<Vec<String>>,
    pub skills_wanted: Option<Vec<String>>,
    pub availability: Option<Availability>,
    pub is_public: Option<bool>,
}

/// Query parameters for browsing public profiles
#[derive(Debug, Deserialize)]
pub struct BrowseUsersQuery {
    /// Case-insensitive substring matched against name and skill lists
    pub search: Option<String>,
    pub availability: Option<Availability>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
