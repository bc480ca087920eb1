use serde::Serialize;
use sqlx::PgPool;

use crate::error::ApiResult;
use crate::feedback::Feedback;
use crate::swaps::SwapRequest;
use crate::users::User;

/// Which CSV export to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Users,
    Swaps,
    Feedback,
}

impl ReportKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "users" => Some(ReportKind::Users),
            "swaps" => Some(ReportKind::Swaps),
            "feedback" => Some(ReportKind::Feedback),
            _ => None,
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ReportKind::Users => "users.csv",
            ReportKind::Swaps => "swaps.csv",
            ReportKind::Feedback => "feedback.csv",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub users: UserStats,
    pub swaps: SwapStats,
    pub feedback: FeedbackStats,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub public: i64,
    pub banned: i64,
    pub admins: i64,
    pub by_availability: Vec<CountBucket>,
}

#[derive(Debug, Serialize)]
pub struct SwapStats {
    pub total: i64,
    pub by_status: Vec<CountBucket>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackStats {
    pub total: i64,
    pub average_rating: Option<f64>,
    pub by_rating: Vec<CountBucket>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CountBucket {
    pub key: String,
    pub count: i64,
}

/// Read-only aggregates and CSV exports over the whole data set
pub struct ReportService {
    db_pool: PgPool,
}

impl ReportService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Platform-wide counts and averages
    pub async fn stats(&self) -> ApiResult<PlatformStats> {
        let (user_total, user_public, user_banned, user_admins) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT COUNT(*),
                       COUNT(*) FILTER (WHERE is_public),
                       COUNT(*) FILTER (WHERE is_banned),
                       COUNT(*) FILTER (WHERE role = 'admin')
                FROM users
                "#,
            )
            .fetch_one(&self.db_pool)
            .await?;

        let by_availability = sqlx::query_as::<_, CountBucket>(
            r#"
            SELECT availability::text AS key, COUNT(*) AS count
            FROM users
            GROUP BY availability
            ORDER BY availability
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let swap_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM swap_requests")
            .fetch_one(&self.db_pool)
            .await?;

        let by_status = sqlx::query_as::<_, CountBucket>(
            r#"
            SELECT status::text AS key, COUNT(*) AS count
            FROM swap_requests
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let (feedback_total, average_rating) = sqlx::query_as::<_, (i64, Option<f64>)>(
            "SELECT COUNT(*), AVG(rating)::float8 FROM feedback",
        )
        .fetch_one(&self.db_pool)
        .await?;

        let by_rating = sqlx::query_as::<_, CountBucket>(
            r#"
            SELECT rating::text AS key, COUNT(*) AS count
            FROM feedback
            GROUP BY rating
            ORDER BY rating
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PlatformStats {
            users: UserStats {
                total: user_total,
                public: user_public,
                banned: user_banned,
                admins: user_admins,
                by_availability,
            },
            swaps: SwapStats {
                total: swap_total,
                by_status,
            },
            feedback: FeedbackStats {
                total: feedback_total,
                average_rating,
                by_rating,
            },
        })
    }

    /// Render one of the record-level exports as a CSV document
    pub async fn csv(&self, kind: ReportKind) -> ApiResult<String> {
        match kind {
            ReportKind::Users => self.users_csv().await,
            ReportKind::Swaps => self.swaps_csv().await,
            ReportKind::Feedback => self.feedback_csv().await,
        }
    }

    async fn users_csv(&self) -> ApiResult<String> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.db_pool)
            .await?;

        let mut out = String::from(
            "id,name,email,location,skills_offered,skills_wanted,availability,role,is_public,is_banned,created_at\n",
        );
        for user in users {
            let line = [
                user.id.to_string(),
                csv_field(&user.name),
                csv_field(&user.email),
                csv_field(user.location.as_deref().unwrap_or("")),
                csv_field(&user.skills_offered.join("; ")),
                csv_field(&user.skills_wanted.join("; ")),
                user.availability.as_str().to_string(),
                user.role.as_str().to_string(),
                user.is_public.to_string(),
                user.is_banned.to_string(),
                user.created_at.to_rfc3339(),
            ]
            .join(",");
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    async fn swaps_csv(&self) -> ApiResult<String> {
        let swaps =
            sqlx::query_as::<_, SwapRequest>("SELECT * FROM swap_requests ORDER BY created_at")
                .fetch_all(&self.db_pool)
                .await?;

        let mut out = String::from(
            "id,requester_id,receiver_id,skill_offered,skill_wanted,status,requester_completed,receiver_completed,created_at,accepted_at,completed_at\n",
        );
        for swap in swaps {
            let line = [
                swap.id.to_string(),
                swap.requester_id.to_string(),
                swap.receiver_id.to_string(),
                csv_field(&swap.skill_offered),
                csv_field(&swap.skill_wanted),
                swap.status.as_str().to_string(),
                swap.requester_completed.to_string(),
                swap.receiver_completed.to_string(),
                swap.created_at.to_rfc3339(),
                swap.accepted_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                swap.completed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ]
            .join(",");
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    async fn feedback_csv(&self) -> ApiResult<String> {
        let rows = sqlx::query_as::<_, Feedback>("SELECT * FROM feedback ORDER BY created_at")
            .fetch_all(&self.db_pool)
            .await?;

        let mut out = String::from(
            "id,swap_id,from_user_id,to_user_id,rating,is_public,comment,created_at\n",
        );
        for feedback in rows {
            let line = [
                feedback.id.to_string(),
                feedback.swap_id.to_string(),
                feedback.from_user_id.to_string(),
                feedback.to_user_id.to_string(),
                feedback.rating.to_string(),
                feedback.is_public.to_string(),
                csv_field(&feedback.comment),
                feedback.created_at.to_rfc3339(),
            ]
            .join(",");
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
