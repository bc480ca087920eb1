use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::notifications::{ChannelEvent, EmailMessage, Notification, NotificationDispatcher};
use crate::swaps::lifecycle::{self, CompletionOutcome, LifecycleError, Side};
use crate::swaps::model::{
    CompleteSwapRequest, CreateSwapRequest, ListSwapsQuery, RejectSwapRequest,
    ScheduleSwapRequest, SwapRequest, SwapRole, SwapStatus,
};
use crate::users::User;

/// Persists swap requests and drives their lifecycle. Every state change is
/// a single guarded UPDATE, so concurrent transitions resolve to one winner
/// and the loser is classified from a re-read.
pub struct SwapService {
    db_pool: PgPool,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl SwapService {
    pub fn new(db_pool: PgPool, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            db_pool,
            dispatcher,
        }
    }

    /// Send a new swap request to another user
    pub async fn create(&self, actor: &User, payload: CreateSwapRequest) -> ApiResult<SwapRequest> {
        payload.validate()?;

        if payload.receiver_id == actor.id {
            return Err(ApiError::InvalidArgument(
                "Cannot send a swap request to yourself".to_string(),
            ));
        }

        let receiver = self.load_user(payload.receiver_id).await?;
        if receiver.is_banned {
            // Banned profiles are hidden everywhere, so the receiver looks absent
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        if !receiver.is_public {
            return Err(ApiError::Forbidden(
                "This profile is private".to_string(),
            ));
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM swap_requests
                WHERE requester_id = $1 AND receiver_id = $2
                  AND skill_offered = $3 AND skill_wanted = $4
                  AND status = 'pending'
            )
            "#,
        )
        .bind(actor.id)
        .bind(receiver.id)
        .bind(&payload.skill_offered)
        .bind(&payload.skill_wanted)
        .fetch_one(&self.db_pool)
        .await?;

        if duplicate {
            return Err(ApiError::Conflict(
                "An identical pending request already exists".to_string(),
            ));
        }

        let now = Utc::now();
        // The partial unique index backstops the pre-check under concurrent sends
        let swap = sqlx::query_as::<_, SwapRequest>(
            r#"
            INSERT INTO swap_requests
                (id, requester_id, receiver_id, skill_offered, skill_wanted, message,
                 status, requester_completed, receiver_completed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', FALSE, FALSE, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.id)
        .bind(receiver.id)
        .bind(&payload.skill_offered)
        .bind(&payload.skill_wanted)
        .bind(&payload.message)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        info!(
            "Swap request {} created: {} -> {}",
            swap.id, actor.id, receiver.id
        );

        self.dispatcher.dispatch(
            Notification::new(
                receiver.id,
                ChannelEvent::NewRequest {
                    swap_id: swap.id,
                    from_name: actor.name.clone(),
                    skill_offered: swap.skill_offered.clone(),
                    skill_wanted: swap.skill_wanted.clone(),
                    message: swap.message.clone(),
                },
            )
            .with_email(EmailMessage {
                to: receiver.email.clone(),
                template: "swap_request_received".to_string(),
                vars: serde_json::json!({
                    "from_name": actor.name,
                    "skill_offered": swap.skill_offered,
                    "skill_wanted": swap.skill_wanted,
                }),
            }),
        );

        Ok(swap)
    }

    /// Fetch a single swap request, participants and admins only
    pub async fn get(&self, actor: &User, id: Uuid) -> ApiResult<SwapRequest> {
        let swap = self.get_swap(id).await?;
        lifecycle::authorize_view(&swap, actor.id, actor.is_admin())?;
        Ok(swap)
    }

    /// List the caller's swap requests, optionally filtered by role and status
    pub async fn list_for_user(
        &self,
        actor: &User,
        query: ListSwapsQuery,
    ) -> ApiResult<PaginatedResponse<SwapRequest>> {
        let params = PaginationParams {
            page: query.page,
            limit: query.limit,
        };

        let push_filters = |qb: &mut sqlx::QueryBuilder<sqlx::Postgres>| {
            match query.role {
                Some(SwapRole::Sent) => {
                    qb.push(" WHERE requester_id = ");
                    qb.push_bind(actor.id);
                }
                Some(SwapRole::Received) => {
                    qb.push(" WHERE receiver_id = ");
                    qb.push_bind(actor.id);
                }
                None => {
                    qb.push(" WHERE (requester_id = ");
                    qb.push_bind(actor.id);
                    qb.push(" OR receiver_id = ");
                    qb.push_bind(actor.id);
                    qb.push(")");
                }
            }
            if let Some(status) = query.status {
                qb.push(" AND status = ");
                qb.push_bind(status);
            }
        };

        let mut count_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT COUNT(*) FROM swap_requests");
        push_filters(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM swap_requests");
        push_filters(&mut query_builder);
        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(params.limit() as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(params.offset());

        let swaps = query_builder
            .build_query_as::<SwapRequest>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(swaps, total, &params))
    }

    /// Accept a pending request, receiver only
    pub async fn accept(&self, actor: &User, id: Uuid) -> ApiResult<SwapRequest> {
        let swap = self.get_swap(id).await?;
        lifecycle::authorize_accept(&swap, actor.id)?;
        let requester = self.load_user(swap.requester_id).await?;

        let now = Utc::now();
        let Some(updated) = sqlx::query_as::<_, SwapRequest>(
            r#"
            UPDATE swap_requests
            SET status = 'accepted', accepted_at = $2, updated_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?
        else {
            return Err(self.pending_race_error(id).await);
        };

        info!("Swap request {} accepted by {}", id, actor.id);

        self.dispatcher.dispatch(
            Notification::new(
                requester.id,
                ChannelEvent::RequestAccepted {
                    swap_id: updated.id,
                    by_name: actor.name.clone(),
                    skill_offered: updated.skill_offered.clone(),
                    skill_wanted: updated.skill_wanted.clone(),
                },
            )
            .with_email(EmailMessage {
                to: requester.email.clone(),
                template: "swap_request_accepted".to_string(),
                vars: serde_json::json!({
                    "by_name": actor.name,
                    "skill_offered": updated.skill_offered,
                    "skill_wanted": updated.skill_wanted,
                }),
            }),
        );

        Ok(updated)
    }

    /// Reject a pending request, receiver only. An optional reason is appended
    /// to the request message so the requester can see it later.
    pub async fn reject(
        &self,
        actor: &User,
        id: Uuid,
        payload: RejectSwapRequest,
    ) -> ApiResult<SwapRequest> {
        payload.validate()?;
        let swap = self.get_swap(id).await?;
        lifecycle::authorize_reject(&swap, actor.id)?;
        let requester = self.load_user(swap.requester_id).await?;

        let now = Utc::now();
        let Some(updated) = sqlx::query_as::<_, SwapRequest>(
            r#"
            UPDATE swap_requests
            SET status = 'rejected',
                rejected_at = $2,
                updated_at = $2,
                message = CASE
                    WHEN $3::text IS NULL THEN message
                    ELSE COALESCE(NULLIF(message, '') || E'\n\n', '') || 'Declined: ' || $3
                END
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(payload.reason.as_deref())
        .fetch_optional(&self.db_pool)
        .await?
        else {
            return Err(self.pending_race_error(id).await);
        };

        info!("Swap request {} rejected by {}", id, actor.id);

        self.dispatcher.dispatch(
            Notification::new(
                requester.id,
                ChannelEvent::RequestRejected {
                    swap_id: updated.id,
                    by_name: actor.name.clone(),
                    reason: payload.reason.clone(),
                },
            )
            .with_email(EmailMessage {
                to: requester.email.clone(),
                template: "swap_request_declined".to_string(),
                vars: serde_json::json!({
                    "by_name": actor.name,
                    "reason": payload.reason,
                }),
            }),
        );

        Ok(updated)
    }

    /// Withdraw a pending request, requester only. The record is removed.
    pub async fn cancel(&self, actor: &User, id: Uuid) -> ApiResult<()> {
        let swap = self.get_swap(id).await?;
        lifecycle::authorize_cancel(&swap, actor.id)?;

        let result = sqlx::query("DELETE FROM swap_requests WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.pending_race_error(id).await);
        }

        info!("Swap request {} cancelled by {}", id, actor.id);
        Ok(())
    }

    /// Record the caller's completion confirmation. The swap flips to
    /// completed only once both sides have confirmed; confirming again after
    /// that is a no-op.
    pub async fn complete(
        &self,
        actor: &User,
        id: Uuid,
        payload: CompleteSwapRequest,
    ) -> ApiResult<SwapRequest> {
        payload.validate()?;
        let swap = self.get_swap(id).await?;
        let (side, outcome) = lifecycle::authorize_complete(&swap, actor.id)?;

        if outcome == CompletionOutcome::AlreadyConfirmed {
            debug!("Swap {} completion repeated by {}, no-op", id, actor.id);
            return Ok(swap);
        }

        let other = self.load_user(lifecycle::counterparty(&swap, side)).await?;

        // The other side's flag is read inside the UPDATE, under the row
        // lock, so two concurrent confirmations serialize and exactly one
        // of them flips the status.
        let sql = match side {
            Side::Requester => {
                r#"
                UPDATE swap_requests
                SET requester_completed = TRUE,
                    status = CASE WHEN receiver_completed THEN 'completed'::swap_status ELSE status END,
                    completed_at = CASE WHEN receiver_completed THEN $2 ELSE completed_at END,
                    session_summary = COALESCE($3, session_summary),
                    session_time = COALESCE($4, session_time),
                    updated_at = $2
                WHERE id = $1 AND status = 'accepted' AND requester_completed = FALSE
                RETURNING *
                "#
            }
            Side::Receiver => {
                r#"
                UPDATE swap_requests
                SET receiver_completed = TRUE,
                    status = CASE WHEN requester_completed THEN 'completed'::swap_status ELSE status END,
                    completed_at = CASE WHEN requester_completed THEN $2 ELSE completed_at END,
                    session_summary = COALESCE($3, session_summary),
                    session_time = COALESCE($4, session_time),
                    updated_at = $2
                WHERE id = $1 AND status = 'accepted' AND receiver_completed = FALSE
                RETURNING *
                "#
            }
        };

        let now = Utc::now();
        let row = sqlx::query_as::<_, SwapRequest>(sql)
            .bind(id)
            .bind(now)
            .bind(payload.session_summary.as_deref())
            .bind(payload.session_time)
            .fetch_optional(&self.db_pool)
            .await?;

        let updated = match row {
            Some(updated) => updated,
            None => {
                // Lost a race since the guard check: re-read and classify
                let current = self.get_swap(id).await?;
                let confirmed = match side {
                    Side::Requester => current.requester_completed,
                    Side::Receiver => current.receiver_completed,
                };
                if confirmed {
                    debug!("Swap {} completion repeated by {}, no-op", id, actor.id);
                    return Ok(current);
                }
                return Err(LifecycleError::WrongStatus {
                    expected: "accepted",
                    actual: current.status.as_str(),
                }
                .into());
            }
        };

        if updated.status == SwapStatus::Completed {
            info!("Swap request {} completed", id);
            self.dispatcher.dispatch(
                Notification::new(
                    other.id,
                    ChannelEvent::SwapCompleted {
                        swap_id: updated.id,
                        by_name: actor.name.clone(),
                        completed_at: updated.completed_at.unwrap_or(now),
                    },
                )
                .with_email(EmailMessage {
                    to: other.email.clone(),
                    template: "swap_completed".to_string(),
                    vars: serde_json::json!({
                        "by_name": actor.name,
                        "skill_offered": updated.skill_offered,
                        "skill_wanted": updated.skill_wanted,
                    }),
                }),
            );
        } else {
            info!("Swap request {} confirmed by one side", id);
            self.dispatcher.dispatch(Notification::new(
                other.id,
                ChannelEvent::SwapProgress {
                    swap_id: updated.id,
                    by_name: actor.name.clone(),
                    requester_completed: updated.requester_completed,
                    receiver_completed: updated.receiver_completed,
                },
            ));
        }

        Ok(updated)
    }

    /// Set or change session logistics on an accepted swap, either participant
    pub async fn schedule(
        &self,
        actor: &User,
        id: Uuid,
        payload: ScheduleSwapRequest,
    ) -> ApiResult<SwapRequest> {
        payload.validate()?;
        let swap = self.get_swap(id).await?;
        let side = lifecycle::authorize_schedule(&swap, actor.id)?;
        let other = self.load_user(lifecycle::counterparty(&swap, side)).await?;

        let now = Utc::now();
        let Some(updated) = sqlx::query_as::<_, SwapRequest>(
            r#"
            UPDATE swap_requests
            SET session_time = COALESCE($2, session_time),
                contact_email = COALESCE($3, contact_email),
                contact_phone = COALESCE($4, contact_phone),
                updated_at = $5
            WHERE id = $1 AND status = 'accepted'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.session_time)
        .bind(payload.contact_email.as_deref())
        .bind(payload.contact_phone.as_deref())
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?
        else {
            let current = self.get_swap(id).await?;
            return Err(LifecycleError::WrongStatus {
                expected: "accepted",
                actual: current.status.as_str(),
            }
            .into());
        };

        info!("Swap request {} session details updated by {}", id, actor.id);

        self.dispatcher.dispatch(Notification::new(
            other.id,
            ChannelEvent::SwapScheduled {
                swap_id: updated.id,
                by_name: actor.name.clone(),
                session_time: updated.session_time,
            },
        ));

        Ok(updated)
    }

    async fn find_swap(&self, id: Uuid) -> ApiResult<Option<SwapRequest>> {
        let swap = sqlx::query_as::<_, SwapRequest>("SELECT * FROM swap_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(swap)
    }

    async fn get_swap(&self, id: Uuid) -> ApiResult<SwapRequest> {
        self.find_swap(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Swap request not found".to_string()))
    }

    async fn load_user(&self, id: Uuid) -> ApiResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Classify a guarded pending-only update that matched no rows
    async fn pending_race_error(&self, id: Uuid) -> ApiError {
        match self.find_swap(id).await {
            Ok(Some(current)) => LifecycleError::WrongStatus {
                expected: "pending",
                actual: current.status.as_str(),
            }
            .into(),
            Ok(None) => ApiError::NotFound("Swap request not found".to_string()),
            Err(e) => e,
        }
    }
}
