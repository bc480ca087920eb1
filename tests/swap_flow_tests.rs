//! End-to-end swap lifecycle tests against a live database
//!
//! The ignored tests need a Postgres instance with schema.sql applied;
//! point TEST_DATABASE_URL at it before running them.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use sqlx::PgPool;
    use uuid::Uuid;
    use validator::Validate;

    use skillswap_server::admin::{AdminService, SetBanRequest};
    use skillswap_server::auth::{AuthService, LoginRequest, RegisterRequest};
    use skillswap_server::error::ApiError;
    use skillswap_server::feedback::{CreateFeedbackRequest, FeedbackService};
    use skillswap_server::notifications::{ChannelEvent, RecordingDispatcher};
    use skillswap_server::swaps::{
        CompleteSwapRequest, CreateSwapRequest, RejectSwapRequest, ScheduleSwapRequest,
        SwapService, SwapStatus,
    };
    use skillswap_server::users::{UpdateProfileRequest, User, UserService};

    /// Helper to create a test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/skillswap_test".to_string());

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    fn test_auth_service(pool: &PgPool) -> AuthService {
        AuthService::new(pool.clone(), "test-secret".to_string(), 3600)
    }

    /// Register a fresh account and return its full record
    async fn register_user(pool: &PgPool, name: &str) -> User {
        let response = test_auth_service(pool)
            .register(RegisterRequest {
                name: name.to_string(),
                email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4()),
                password: "password123".to_string(),
            })
            .await
            .expect("registration should succeed");

        UserService::new(pool.clone())
            .get_by_id(response.user.id)
            .await
            .expect("registered user should exist")
    }

    fn swap_request_to(receiver: &User) -> CreateSwapRequest {
        CreateSwapRequest {
            receiver_id: receiver.id,
            skill_offered: "Rust".to_string(),
            skill_wanted: "Piano".to_string(),
            message: "Saturday afternoons?".to_string(),
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_full_swap_lifecycle() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let swaps = SwapService::new(pool.clone(), dispatcher.clone());

        let ada = register_user(&pool, "Ada").await;
        let brin = register_user(&pool, "Brin").await;

        let swap = swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect("create should succeed");
        assert_eq!(swap.status, SwapStatus::Pending);
        assert!(!swap.requester_completed);
        assert!(!swap.receiver_completed);

        let swap = swaps
            .accept(&brin, swap.id)
            .await
            .expect("receiver accept should succeed");
        assert_eq!(swap.status, SwapStatus::Accepted);
        assert!(swap.accepted_at.is_some());

        // First confirmation keeps the swap accepted
        let swap = swaps
            .complete(&ada, swap.id, CompleteSwapRequest::default())
            .await
            .expect("requester completion should succeed");
        assert_eq!(swap.status, SwapStatus::Accepted);
        assert!(swap.requester_completed);
        assert!(swap.completed_at.is_none());

        // Second confirmation closes it
        let swap = swaps
            .complete(&brin, swap.id, CompleteSwapRequest::default())
            .await
            .expect("receiver completion should succeed");
        assert_eq!(swap.status, SwapStatus::Completed);
        assert!(swap.receiver_completed);
        assert!(swap.completed_at.is_some());

        // Confirming again after full completion is a no-op
        let brin_events_before = dispatcher.events_for(brin.id).len();
        let again = swaps
            .complete(&ada, swap.id, CompleteSwapRequest::default())
            .await
            .expect("repeat completion should be a no-op");
        assert_eq!(again.status, SwapStatus::Completed);
        assert_eq!(dispatcher.events_for(brin.id).len(), brin_events_before);

        let ada_events = dispatcher.events_for(ada.id);
        assert_eq!(ada_events.len(), 2);
        assert!(matches!(ada_events[0], ChannelEvent::RequestAccepted { .. }));
        assert!(matches!(ada_events[1], ChannelEvent::SwapCompleted { .. }));

        let brin_events = dispatcher.events_for(brin.id);
        assert_eq!(brin_events.len(), 2);
        assert!(matches!(brin_events[0], ChannelEvent::NewRequest { .. }));
        assert!(matches!(brin_events[1], ChannelEvent::SwapProgress { .. }));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_duplicate_pending_request_conflict() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let swaps = SwapService::new(pool.clone(), dispatcher.clone());

        let ada = register_user(&pool, "Ada").await;
        let brin = register_user(&pool, "Brin").await;

        let first = swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect("first request should succeed");

        let err = swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect_err("identical pending request should be rejected");
        assert!(matches!(err, ApiError::Conflict(_)));

        // Once the pending request transitions, the same tuple is free again
        swaps
            .accept(&brin, first.id)
            .await
            .expect("accept should succeed");
        swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect("request should succeed after the first one was accepted");
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_private_receiver_blocks_requests() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let swaps = SwapService::new(pool.clone(), dispatcher.clone());
        let users = UserService::new(pool.clone());

        let admin = register_user(&pool, "Root").await;
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(admin.id)
            .execute(&pool)
            .await
            .expect("promote admin");
        let admin = users.get_by_id(admin.id).await.expect("reload admin");

        let ada = register_user(&pool, "Ada").await;
        let hermit = register_user(&pool, "Hermit").await;
        users
            .update_profile(
                hermit.id,
                UpdateProfileRequest {
                    is_public: Some(false),
                    ..Default::default()
                },
            )
            .await
            .expect("going private should succeed");

        // Privacy blocks every sender, admins included
        let err = swaps
            .create(&ada, swap_request_to(&hermit))
            .await
            .expect_err("request to a private profile");
        assert!(matches!(err, ApiError::Forbidden(_)));
        let err = swaps
            .create(&admin, swap_request_to(&hermit))
            .await
            .expect_err("admin request to a private profile");
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(dispatcher.events_for(hermit.id).is_empty());

        // Going public again lifts the block
        users
            .update_profile(
                hermit.id,
                UpdateProfileRequest {
                    is_public: Some(true),
                    ..Default::default()
                },
            )
            .await
            .expect("going public should succeed");
        swaps
            .create(&ada, swap_request_to(&hermit))
            .await
            .expect("request should succeed once the profile is public");
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_reject_carries_reason() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let swaps = SwapService::new(pool.clone(), dispatcher.clone());

        let ada = register_user(&pool, "Ada").await;
        let brin = register_user(&pool, "Brin").await;

        let swap = swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect("create should succeed");

        let rejected = swaps
            .reject(
                &brin,
                swap.id,
                RejectSwapRequest {
                    reason: Some("Fully booked this month".to_string()),
                },
            )
            .await
            .expect("receiver reject should succeed");
        assert_eq!(rejected.status, SwapStatus::Rejected);
        assert!(rejected.rejected_at.is_some());
        assert!(rejected.message.contains("Declined: Fully booked this month"));
        // The original message stays in front of the appended reason
        assert!(rejected.message.starts_with("Saturday afternoons?"));

        let ada_events = dispatcher.events_for(ada.id);
        assert!(ada_events.iter().any(|e| matches!(
            e,
            ChannelEvent::RequestRejected { reason: Some(r), .. } if r == "Fully booked this month"
        )));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_schedule_keeps_omitted_fields() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let swaps = SwapService::new(pool.clone(), dispatcher.clone());

        let ada = register_user(&pool, "Ada").await;
        let brin = register_user(&pool, "Brin").await;

        let swap = swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect("create should succeed");
        swaps.accept(&brin, swap.id).await.expect("accept");

        // Receiver fills in the full logistics
        let first_session = Utc.with_ymd_and_hms(2026, 9, 12, 17, 0, 0).unwrap();
        let swap = swaps
            .schedule(
                &brin,
                swap.id,
                ScheduleSwapRequest {
                    session_time: Some(first_session),
                    contact_email: Some("brin@example.com".to_string()),
                    contact_phone: Some("+1 555 0134".to_string()),
                },
            )
            .await
            .expect("initial schedule should succeed");
        assert_eq!(swap.session_time, Some(first_session));
        assert_eq!(swap.contact_email.as_deref(), Some("brin@example.com"));
        assert_eq!(swap.contact_phone.as_deref(), Some("+1 555 0134"));

        // Moving the time alone leaves the contact details in place
        let second_session = Utc.with_ymd_and_hms(2026, 9, 19, 17, 0, 0).unwrap();
        let swap = swaps
            .schedule(
                &ada,
                swap.id,
                ScheduleSwapRequest {
                    session_time: Some(second_session),
                    ..Default::default()
                },
            )
            .await
            .expect("time-only reschedule should succeed");
        assert_eq!(swap.session_time, Some(second_session));
        assert_eq!(swap.contact_email.as_deref(), Some("brin@example.com"));
        assert_eq!(swap.contact_phone.as_deref(), Some("+1 555 0134"));

        // Changing the email alone keeps the agreed time
        let swap = swaps
            .schedule(
                &ada,
                swap.id,
                ScheduleSwapRequest {
                    contact_email: Some("ada@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("email-only update should succeed");
        assert_eq!(swap.session_time, Some(second_session));
        assert_eq!(swap.contact_email.as_deref(), Some("ada@example.com"));
        assert_eq!(swap.contact_phone.as_deref(), Some("+1 555 0134"));

        // Every change notified the counterparty of the scheduler
        let ada_scheduled: Vec<_> = dispatcher
            .events_for(ada.id)
            .into_iter()
            .filter(|e| matches!(e, ChannelEvent::SwapScheduled { .. }))
            .collect();
        assert_eq!(ada_scheduled.len(), 1);

        let brin_scheduled: Vec<_> = dispatcher
            .events_for(brin.id)
            .into_iter()
            .filter(|e| matches!(e, ChannelEvent::SwapScheduled { .. }))
            .collect();
        assert_eq!(brin_scheduled.len(), 2);
        assert!(matches!(
            &brin_scheduled[1],
            ChannelEvent::SwapScheduled { session_time: Some(t), .. } if *t == second_session
        ));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_lifecycle_guards() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let swaps = SwapService::new(pool.clone(), dispatcher.clone());

        let ada = register_user(&pool, "Ada").await;
        let brin = register_user(&pool, "Brin").await;
        let eve = register_user(&pool, "Eve").await;

        let swap = swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect("create should succeed");

        // Only the receiver may accept
        let err = swaps.accept(&ada, swap.id).await.expect_err("requester");
        assert!(matches!(err, ApiError::Forbidden(_)));
        let err = swaps.accept(&eve, swap.id).await.expect_err("stranger");
        assert!(matches!(err, ApiError::Forbidden(_)));

        swaps.accept(&brin, swap.id).await.expect("receiver accept");

        // Pending-only transitions fail once accepted
        let err = swaps
            .reject(&brin, swap.id, RejectSwapRequest::default())
            .await
            .expect_err("reject after accept");
        assert!(matches!(err, ApiError::InvalidState(_)));
        let err = swaps.cancel(&ada, swap.id).await.expect_err("cancel after accept");
        assert!(matches!(err, ApiError::InvalidState(_)));

        // Cancel removes a pending request entirely
        let other = swaps
            .create(&ada, CreateSwapRequest {
                receiver_id: brin.id,
                skill_offered: "Chess".to_string(),
                skill_wanted: "Go".to_string(),
                message: String::new(),
            })
            .await
            .expect("second create should succeed");
        swaps.cancel(&ada, other.id).await.expect("cancel pending");
        let err = swaps.get(&ada, other.id).await.expect_err("cancelled swap");
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_feedback_rules() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let swaps = SwapService::new(pool.clone(), dispatcher.clone());
        let feedback = FeedbackService::new(pool.clone(), dispatcher.clone());

        let ada = register_user(&pool, "Ada").await;
        let brin = register_user(&pool, "Brin").await;
        let eve = register_user(&pool, "Eve").await;

        let swap = swaps
            .create(&ada, swap_request_to(&brin))
            .await
            .expect("create should succeed");
        swaps.accept(&brin, swap.id).await.expect("accept");

        // Not completed yet
        let err = feedback
            .create(
                &ada,
                CreateFeedbackRequest {
                    swap_id: swap.id,
                    rating: 5,
                    comment: String::new(),
                    is_public: true,
                },
            )
            .await
            .expect_err("feedback before completion");
        assert!(matches!(err, ApiError::InvalidState(_)));

        swaps
            .complete(&ada, swap.id, CompleteSwapRequest::default())
            .await
            .expect("requester completion");
        swaps
            .complete(&brin, swap.id, CompleteSwapRequest::default())
            .await
            .expect("receiver completion");

        // Outsiders cannot rate
        let err = feedback
            .create(
                &eve,
                CreateFeedbackRequest {
                    swap_id: swap.id,
                    rating: 1,
                    comment: String::new(),
                    is_public: true,
                },
            )
            .await
            .expect_err("outsider feedback");
        assert!(matches!(err, ApiError::Forbidden(_)));

        let created = feedback
            .create(
                &ada,
                CreateFeedbackRequest {
                    swap_id: swap.id,
                    rating: 5,
                    comment: "Great teacher".to_string(),
                    is_public: true,
                },
            )
            .await
            .expect("participant feedback");
        assert_eq!(created.to_user_id, brin.id);

        // One row per (author, recipient, swap)
        let err = feedback
            .create(
                &ada,
                CreateFeedbackRequest {
                    swap_id: swap.id,
                    rating: 4,
                    comment: String::new(),
                    is_public: true,
                },
            )
            .await
            .expect_err("duplicate feedback");
        assert!(matches!(err, ApiError::Conflict(_)));

        // The other side rates independently
        feedback
            .create(
                &brin,
                CreateFeedbackRequest {
                    swap_id: swap.id,
                    rating: 4,
                    comment: String::new(),
                    is_public: true,
                },
            )
            .await
            .expect("counterparty feedback");

        let summary = UserService::new(pool.clone())
            .rating_summary(brin.id)
            .await
            .expect("rating summary");
        assert_eq!(summary.count, 1);
        assert_eq!(summary.average, Some(5.0));

        let brin_events = dispatcher.events_for(brin.id);
        assert!(brin_events
            .iter()
            .any(|e| matches!(e, ChannelEvent::FeedbackReceived { rating: 5, .. })));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_ban_flow() {
        let pool = setup_test_db().await;
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let admin_service = AdminService::new(pool.clone(), dispatcher.clone());
        let auth = test_auth_service(&pool);

        let admin = register_user(&pool, "Root").await;
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(admin.id)
            .execute(&pool)
            .await
            .expect("promote admin");
        let admin = UserService::new(pool.clone())
            .get_by_id(admin.id)
            .await
            .expect("reload admin");

        let target = register_user(&pool, "Mallory").await;
        let target_email = target.email.clone();
        let token = auth
            .login(LoginRequest {
                email: target_email.clone(),
                password: "password123".to_string(),
            })
            .await
            .expect("login before ban")
            .token;

        let banned = admin_service
            .set_ban(
                &admin,
                target.id,
                SetBanRequest {
                    banned: true,
                    reason: Some("spam".to_string()),
                },
            )
            .await
            .expect("ban should succeed");
        assert!(banned.is_banned);
        assert!(banned.banned_at.is_some());

        // Existing tokens stop working and login is refused
        let err = auth.authenticate_token(&token).await.expect_err("banned token");
        assert!(matches!(err, ApiError::Forbidden(_)));
        let err = auth
            .login(LoginRequest {
                email: target_email.clone(),
                password: "password123".to_string(),
            })
            .await
            .expect_err("banned login");
        assert!(matches!(err, ApiError::Forbidden(_)));

        // Re-applying the same state changes nothing and stays silent
        let events_before = dispatcher.events_for(target.id).len();
        admin_service
            .set_ban(
                &admin,
                target.id,
                SetBanRequest {
                    banned: true,
                    reason: Some("spam".to_string()),
                },
            )
            .await
            .expect("repeat ban is a no-op");
        assert_eq!(dispatcher.events_for(target.id).len(), events_before);

        let unbanned = admin_service
            .set_ban(
                &admin,
                target.id,
                SetBanRequest {
                    banned: false,
                    reason: None,
                },
            )
            .await
            .expect("unban should succeed");
        assert!(!unbanned.is_banned);
        assert!(unbanned.banned_at.is_none());

        auth.login(LoginRequest {
            email: target_email,
            password: "password123".to_string(),
        })
        .await
        .expect("login after unban");

        let target_events = dispatcher.events_for(target.id);
        let status_changes: Vec<_> = target_events
            .iter()
            .filter(|e| matches!(e, ChannelEvent::AccountStatusChanged { .. }))
            .collect();
        assert_eq!(status_changes.len(), 2);
    }

    #[test]
    fn test_swap_request_validation() {
        let mut request = CreateSwapRequest {
            receiver_id: Uuid::new_v4(),
            skill_offered: "Rust".to_string(),
            skill_wanted: "Piano".to_string(),
            message: String::new(),
        };
        assert!(request.validate().is_ok());

        request.skill_offered = String::new();
        assert!(request.validate().is_err());

        request.skill_offered = "x".repeat(101);
        assert!(request.validate().is_err());

        request.skill_offered = "Rust".to_string();
        request.message = "m".repeat(1001);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_feedback_request_validation() {
        let mut request = CreateFeedbackRequest {
            swap_id: Uuid::new_v4(),
            rating: 3,
            comment: String::new(),
            is_public: true,
        };
        assert!(request.validate().is_ok());

        for rating in [0, 6, -1] {
            request.rating = rating;
            assert!(request.validate().is_err(), "rating {} should fail", rating);
        }

        request.rating = 5;
        request.comment = "c".repeat(1001);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let mut request = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(request.validate().is_ok());

        request.email = "not-an-email".to_string();
        assert!(request.validate().is_err());

        request.email = "ada@example.com".to_string();
        request.password = "short".to_string();
        assert!(request.validate().is_err());
    }
}
