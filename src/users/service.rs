//! User service layer - profile management and discovery

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{PaginatedResponse, PaginationParams};
use crate::users::model::{
    BrowseUsersQuery, PublicProfile, RatingSummary, UpdateProfileRequest, User,
};

/// User service for profile management and discovery
#[derive(Clone)]
pub struct UserService {
    db_pool: PgPool,
}

impl UserService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Fetch a user by ID
    pub async fn get_by_id(&self, id: Uuid) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    /// View a user's profile.
    ///
    /// Private profiles are visible only to the owner and admins. Banned
    /// accounts are hidden from everyone else.
    pub async fn get_profile(&self, id: Uuid, viewer: Option<&User>) -> ApiResult<PublicProfile> {
        let user = self.get_by_id(id).await?;

        let is_privileged = viewer
            .map(|v| v.id == user.id || v.is_admin())
            .unwrap_or(false);

        if user.is_banned && !is_privileged {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        if !user.is_public && !is_privileged {
            return Err(ApiError::Forbidden("This profile is private".to_string()));
        }

        let rating = self.rating_summary(user.id).await?;

        Ok(PublicProfile {
            id: user.id,
            name: user.name,
            location: user.location,
            skills_offered: user.skills_offered,
            skills_wanted: user.skills_wanted,
            availability: user.availability,
            rating,
            member_since: user.created_at,
        })
    }

    /// Browse public profiles with optional search and availability filters
    pub async fn browse(
        &self,
        query: BrowseUsersQuery,
    ) -> ApiResult<PaginatedResponse<PublicProfile>> {
        let params = PaginationParams {
            page: query.page,
            limit: query.limit,
        };

        let push_filters = |qb: &mut sqlx::QueryBuilder<sqlx::Postgres>| {
            qb.push(" WHERE is_public = TRUE AND is_banned = FALSE");

            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                qb.push(" AND (name ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR array_to_string(skills_offered, ' ') ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR array_to_string(skills_wanted, ' ') ILIKE ");
                qb.push_bind(pattern);
                qb.push(")");
            }
            if let Some(availability) = query.availability {
                qb.push(" AND availability = ");
                qb.push_bind(availability);
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

        let mut profiles = Vec::with_capacity(users.len());
        for user in users {
            let rating = self.rating_summary(user.id).await?;
            profiles.push(PublicProfile {
                id: user.id,
                name: user.name,
                location: user.location,
                skills_offered: user.skills_offered,
                skills_wanted: user.skills_wanted,
                availability: user.availability,
                rating,
                member_since: user.created_at,
            });
        }

        Ok(PaginatedResponse::new(profiles, total, &params))
    }

    /// Update the caller's own profile fields
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> ApiResult<User> {
        request.validate()?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                location = COALESCE($3, location),
                skills_offered = COALESCE($4, skills_offered),
                skills_wanted = COALESCE($5, skills_wanted),
                availability = COALESCE($6, availability),
                is_public = COALESCE($7, is_public),
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(request.name)
        .bind(request.location)
        .bind(request.skills_offered)
        .bind(request.skills_wanted)
        .bind(request.availability)
        .bind(request.is_public)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(user)
    }

    /// Aggregate public feedback into a rating summary
    pub async fn rating_summary(&self, user_id: Uuid) -> ApiResult<RatingSummary> {
        let row: (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rating)::float8, COUNT(*)
            FROM feedback
            WHERE to_user_id = $1 AND is_public = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(RatingSummary {
            average: row.0,
            count: row.1,
        })
    }
}
