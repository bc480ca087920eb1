//! Swap request models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Swap request model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct SwapRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub skill_offered: String,
    pub skill_wanted: String,
    pub message: String,
    pub status: SwapStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub requester_completed: bool,
    pub receiver_completed: bool,
    pub session_time: Option<DateTime<Utc>>,
    pub session_summary: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Swap request status
///
/// pending -> accepted -> completed
/// pending -> rejected
/// (pending requests can also be cancelled, which deletes them)
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "swap_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Completed => "completed",
        }
    }
}

/// Request DTO for creating a swap request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSwapRequest {
    pub receiver_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub skill_offered: String,
    #[validate(length(min = 1, max = 100))]
    pub skill_wanted: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub message: String,
}

/// Request DTO for rejecting a swap request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectSwapRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Request DTO for confirming completion
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteSwapRequest {
    #[validate(length(max = 2000))]
    pub session_summary: Option<String>,
    pub session_time: Option<DateTime<Utc>>,
}

/// Request DTO for scheduling a session.
/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ScheduleSwapRequest {
    pub session_time: Option<DateTime<Utc>>,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(length(max = 30))]
    pub contact_phone: Option<String>,
}

/// Which side of a swap to list
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwapRole {
    Sent,
    Received,
}

/// Query parameters for listing the caller's swap requests
#[derive(Debug, Deserialize)]
pub struct ListSwapsQuery {
    pub role: Option<SwapRole>,
    pub status: Option<SwapStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
