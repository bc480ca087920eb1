use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A rating left by one participant of a completed swap about the other
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Feedback {
    pub id: Uuid,
    pub swap_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedbackRequest {
    pub swap_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFeedbackRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
    pub is_public: Option<bool>,
}

/// A public feedback row joined with the author's display name
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub swap_id: Uuid,
    pub from_user_id: Uuid,
    pub from_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListFeedbackQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

fn default_public() -> bool {
    true
}
