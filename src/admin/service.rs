use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::notifications::{ChannelEvent, EmailMessage, Notification, NotificationDispatcher};
use crate::users::{User, UserRole};

#[derive(Debug, Deserialize, Validate)]
pub struct SetBanRequest {
    pub banned: bool,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminListUsersQuery {
    pub search: Option<String>,
    pub banned: Option<bool>,
    pub role: Option<UserRole>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Moderation actions. Every mutation is performed by a resolved admin
/// account; the extractor has already checked the role.
pub struct AdminService {
    db_pool: PgPool,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl AdminService {
    pub fn new(db_pool: PgPool, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            db_pool,
            dispatcher,
        }
    }

    /// Full user directory, banned and private accounts included
    pub async fn list_users(
        &self,
        query: AdminListUsersQuery,
    ) -> ApiResult<PaginatedResponse<User>> {
        let params = PaginationParams {
            page: query.page,
            limit: query.limit,
        };

        let push_filters = |qb: &mut sqlx::QueryBuilder<sqlx::Postgres>| {
            qb.push(" WHERE TRUE");

            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                qb.push(" AND (name ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR email ILIKE ");
                qb.push_bind(pattern);
                qb.push(")");
            }
            if let Some(banned) = query.banned {
                qb.push(" AND is_banned = ");
                qb.push_bind(banned);
            }
            if let Some(role) = query.role {
                qb.push(" AND role = ");
                qb.push_bind(role);
            }
        };

        let mut count_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM users");
        push_filters(&mut query_builder);
        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(params.limit() as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(params.offset());

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(users, total, &params))
    }

    /// Ban or unban an account. Re-applying the current state is a no-op
    /// and dispatches nothing.
    pub async fn set_ban(
        &self,
        admin: &User,
        user_id: Uuid,
        payload: SetBanRequest,
    ) -> ApiResult<User> {
        payload.validate()?;

        if user_id == admin.id {
            return Err(ApiError::InvalidArgument(
                "Cannot change the ban status of your own account".to_string(),
            ));
        }

        let target = self.load_user(user_id).await?;
        if target.is_admin() {
            return Err(ApiError::Forbidden(
                "Cannot ban another admin".to_string(),
            ));
        }

        if target.is_banned == payload.banned {
            debug!(
                "Ban state for {} already {}, no-op",
                user_id, payload.banned
            );
            return Ok(target);
        }

        let now = Utc::now();
        let updated = if payload.banned {
            sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET is_banned = TRUE, banned_at = $2, ban_reason = $3, updated_at = $2
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(now)
            .bind(payload.reason.as_deref())
            .fetch_one(&self.db_pool)
            .await?
        } else {
            sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET is_banned = FALSE, banned_at = NULL, ban_reason = NULL, updated_at = $2
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(now)
            .fetch_one(&self.db_pool)
            .await?
        };

        info!(
            "User {} {} by admin {}",
            user_id,
            if payload.banned { "banned" } else { "unbanned" },
            admin.id
        );

        // Banned users cannot hold a socket open, so email is the channel
        // that actually reaches them
        self.dispatcher.dispatch(
            Notification::new(
                user_id,
                ChannelEvent::AccountStatusChanged {
                    banned: payload.banned,
                    reason: payload.reason.clone(),
                },
            )
            .with_email(EmailMessage {
                to: updated.email.clone(),
                template: "account_status_changed".to_string(),
                vars: serde_json::json!({
                    "banned": payload.banned,
                    "reason": payload.reason,
                }),
            }),
        );

        Ok(updated)
    }

    /// Promote or demote an account. Assigning the current role is a no-op
    /// and dispatches nothing.
    pub async fn set_role(
        &self,
        admin: &User,
        user_id: Uuid,
        payload: SetRoleRequest,
    ) -> ApiResult<User> {
        if user_id == admin.id {
            return Err(ApiError::InvalidArgument(
                "Cannot change your own role".to_string(),
            ));
        }

        let target = self.load_user(user_id).await?;
        if target.role == payload.role {
            debug!("Role for {} already {}, no-op", user_id, payload.role.as_str());
            return Ok(target);
        }

        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(payload.role)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        info!(
            "User {} role set to {} by admin {}",
            user_id,
            payload.role.as_str(),
            admin.id
        );

        self.dispatcher.dispatch(Notification::new(
            user_id,
            ChannelEvent::RoleChanged {
                role: payload.role.as_str().to_string(),
            },
        ));

        Ok(updated)
    }

    async fn load_user(&self, id: Uuid) -> ApiResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}
