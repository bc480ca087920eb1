//! Authentication service
//!
//! Email/password registration and login, plus token-to-actor resolution.
//! Every authenticated request re-resolves the full user record so bans and
//! role changes take effect immediately, not at token expiry.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::users::{User, UserResponse};

use super::jwt::{generate_access_token, get_user_id_from_claims, verify_token, JwtError};
use super::password::{hash_password, verify_password};

/// Request body for registration
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Request body for login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token response for register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db_pool: PgPool,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(db_pool: PgPool, jwt_secret: String, access_token_ttl_seconds: i64) -> Self {
        Self {
            db_pool,
            jwt_secret,
            access_token_ttl_seconds,
        }
    }

    /// Register a new account and issue a token
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthResponse> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.db_pool)
            .await?;

        if existing.is_some() {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let now = Utc::now();
        // The unique index on email backstops the pre-check under races
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, skills_offered, skills_wanted,
                availability, is_public, role, is_banned, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'available', TRUE, 'user', FALSE, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(Vec::<String>::new())
        .bind(Vec::<String>::new())
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.issue_token(user)
    }

    /// Verify credentials and issue a token
    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.db_pool)
            .await?;

        // Same message for unknown email and wrong password
        let user = user.ok_or_else(|| {
            ApiError::Unauthorized("Invalid email or password".to_string())
        })?;

        let valid = verify_password(&request.password, &user.password_hash)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        if !valid {
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }

        if user.is_banned {
            return Err(ApiError::Forbidden("This account has been banned".to_string()));
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.issue_token(user)
    }

    /// Resolve a bearer token to its live user record.
    ///
    /// Rejects banned accounts regardless of what the token claims.
    pub async fn authenticate_token(&self, token: &str) -> ApiResult<User> {
        let claims = verify_token(token, &self.jwt_secret).map_err(|e| match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })?;

        let user_id = get_user_id_from_claims(&claims)
            .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;

        let user =
            user.ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

        if user.is_banned {
            return Err(ApiError::Forbidden("This account has been banned".to_string()));
        }

        Ok(user)
    }

    fn issue_token(&self, user: User) -> ApiResult<AuthResponse> {
        let token = generate_access_token(&user, &self.jwt_secret, self.access_token_ttl_seconds)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            user: user.into(),
        })
    }
}
