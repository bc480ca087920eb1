use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::notifications::{ChannelEvent, Notification, NotificationDispatcher};
use crate::feedback::model::{
    CreateFeedbackRequest, Feedback, FeedbackEntry, ListFeedbackQuery, UpdateFeedbackRequest,
};
use crate::swaps::{SwapRequest, SwapStatus};
use crate::users::User;

pub struct FeedbackService {
    db_pool: PgPool,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl FeedbackService {
    pub fn new(db_pool: PgPool, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            db_pool,
            dispatcher,
        }
    }

    /// Leave feedback about the other participant of a completed swap.
    /// One row per (author, recipient, swap).
    pub async fn create(&self, actor: &User, payload: CreateFeedbackRequest) -> ApiResult<Feedback> {
        payload.validate()?;

        let swap = sqlx::query_as::<_, SwapRequest>("SELECT * FROM swap_requests WHERE id = $1")
            .bind(payload.swap_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Swap request not found".to_string()))?;

        let to_user_id = if actor.id == swap.requester_id {
            swap.receiver_id
        } else if actor.id == swap.receiver_id {
            swap.requester_id
        } else {
            return Err(ApiError::Forbidden(
                "Only swap participants can leave feedback".to_string(),
            ));
        };

        if swap.status != SwapStatus::Completed {
            return Err(ApiError::InvalidState(
                "Feedback requires a completed swap".to_string(),
            ));
        }

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM feedback
                WHERE from_user_id = $1 AND to_user_id = $2 AND swap_id = $3
            )
            "#,
        )
        .bind(actor.id)
        .bind(to_user_id)
        .bind(swap.id)
        .fetch_one(&self.db_pool)
        .await?;

        if exists {
            return Err(ApiError::Conflict(
                "Feedback already submitted for this swap".to_string(),
            ));
        }

        let now = Utc::now();
        // The compound unique index backstops the pre-check under races
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback
                (id, swap_id, from_user_id, to_user_id, rating, comment, is_public,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(swap.id)
        .bind(actor.id)
        .bind(to_user_id)
        .bind(payload.rating)
        .bind(&payload.comment)
        .bind(payload.is_public)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        info!(
            "Feedback {} created for swap {}: {} -> {}",
            feedback.id, swap.id, actor.id, to_user_id
        );

        self.dispatcher.dispatch(Notification::new(
            to_user_id,
            ChannelEvent::FeedbackReceived {
                feedback_id: feedback.id,
                from_name: actor.name.clone(),
                rating: feedback.rating,
                comment: feedback.comment.clone(),
            },
        ));

        Ok(feedback)
    }

    /// Edit feedback, author only. Absent fields are left unchanged.
    pub async fn update(
        &self,
        actor: &User,
        id: Uuid,
        payload: UpdateFeedbackRequest,
    ) -> ApiResult<Feedback> {
        payload.validate()?;
        self.get_owned(actor, id).await?;

        let updated = sqlx::query_as::<_, Feedback>(
            r#"
            UPDATE feedback
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                is_public = COALESCE($4, is_public),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.rating)
        .bind(payload.comment.as_deref())
        .bind(payload.is_public)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        debug!("Feedback {} updated by {}", id, actor.id);
        Ok(updated)
    }

    /// Remove feedback, author only
    pub async fn delete(&self, actor: &User, id: Uuid) -> ApiResult<()> {
        self.get_owned(actor, id).await?;

        sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        info!("Feedback {} deleted by {}", id, actor.id);
        Ok(())
    }

    /// Public feedback received by a user, newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        query: ListFeedbackQuery,
    ) -> ApiResult<PaginatedResponse<FeedbackEntry>> {
        let banned = sqlx::query_scalar::<_, bool>("SELECT is_banned FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;
        match banned {
            Some(false) => {}
            // Banned profiles are hidden along with their feedback
            Some(true) | None => {
                return Err(ApiError::NotFound("User not found".to_string()));
            }
        }

        let params = PaginationParams {
            page: query.page,
            limit: query.limit,
        };

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM feedback WHERE to_user_id = $1 AND is_public = TRUE",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        let entries = sqlx::query_as::<_, FeedbackEntry>(
            r#"
            SELECT f.id, f.swap_id, f.from_user_id, u.name AS from_name,
                   f.rating, f.comment, f.created_at
            FROM feedback f
            JOIN users u ON u.id = f.from_user_id
            WHERE f.to_user_id = $1 AND f.is_public = TRUE
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(params.limit() as i64)
        .bind(params.offset())
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PaginatedResponse::new(entries, total, &params))
    }

    async fn get_owned(&self, actor: &User, id: Uuid) -> ApiResult<Feedback> {
        let feedback = sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Feedback not found".to_string()))?;

        if feedback.from_user_id != actor.id {
            return Err(ApiError::Forbidden(
                "Only the author can modify feedback".to_string(),
            ));
        }
        Ok(feedback)
    }
}
