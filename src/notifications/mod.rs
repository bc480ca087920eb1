//! Notification dispatch for real-time and email side channels
//!
//! Swap and admin services emit [`Notification`]s through an injected
//! [`NotificationDispatcher`]. Delivery is best-effort: the real-time channel
//! drops events for users without an open connection and email failures are
//! logged and swallowed. Neither path ever fails a request.

use serde::Serialize;
use sqlx::types::chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::websocket::ChannelRegistry;

mod mailer;

pub use mailer::Mailer;

/// Typed events delivered over a user's private real-time channel
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    NewRequest {
        swap_id: Uuid,
        from_name: String,
        skill_offered: String,
        skill_wanted: String,
        message: String,
    },
    RequestAccepted {
        swap_id: Uuid,
        by_name: String,
        skill_offered: String,
        skill_wanted: String,
    },
    RequestRejected {
        swap_id: Uuid,
        by_name: String,
        reason: Option<String>,
    },
    SwapProgress {
        swap_id: Uuid,
        by_name: String,
        requester_completed: bool,
        receiver_completed: bool,
    },
    SwapCompleted {
        swap_id: Uuid,
        by_name: String,
        completed_at: DateTime<Utc>,
    },
    SwapScheduled {
        swap_id: Uuid,
        by_name: String,
        session_time: Option<DateTime<Utc>>,
    },
    FeedbackReceived {
        feedback_id: Uuid,
        from_name: String,
        rating: i32,
        comment: String,
    },
    AccountStatusChanged {
        banned: bool,
        reason: Option<String>,
    },
    RoleChanged {
        role: String,
    },
}

/// Outbound email referencing a provider-side template
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub template: String,
    pub vars: serde_json::Value,
}

/// A notification addressed to a single user
#[derive(Debug, Clone)]
pub struct Notification {
    pub recipient: Uuid,
    pub event: ChannelEvent,
    pub email: Option<EmailMessage>,
}

impl Notification {
    pub fn new(recipient: Uuid, event: ChannelEvent) -> Self {
        Self {
            recipient,
            event,
            email: None,
        }
    }

    pub fn with_email(mut self, email: EmailMessage) -> Self {
        self.email = Some(email);
        self
    }
}

/// Delivery interface injected into the services.
///
/// `dispatch` must never block and never error; implementations handle
/// delivery problems internally.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification);
}

/// Production dispatcher: publishes to the recipient's real-time channel and
/// sends the optional email off the request path.
pub struct ChannelDispatcher {
    registry: ChannelRegistry,
    mailer: Arc<Mailer>,
}

impl ChannelDispatcher {
    pub fn new(registry: ChannelRegistry, mailer: Arc<Mailer>) -> Self {
        Self { registry, mailer }
    }
}

impl NotificationDispatcher for ChannelDispatcher {
    fn dispatch(&self, notification: Notification) {
        let registry = self.registry.clone();
        let mailer = self.mailer.clone();

        tokio::spawn(async move {
            registry
                .publish(notification.recipient, notification.event)
                .await;

            if let Some(email) = notification.email {
                mailer.send(email).await;
            }
        });
    }
}

/// Dispatcher that drops everything. Used where side effects are unwanted.
#[derive(Default)]
pub struct NoopDispatcher;

impl NotificationDispatcher for NoopDispatcher {
    fn dispatch(&self, notification: Notification) {
        tracing::debug!(recipient = %notification.recipient, "Notification dropped (noop dispatcher)");
    }
}

/// Dispatcher that records every notification for inspection in tests
#[derive(Default)]
pub struct RecordingDispatcher {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded notifications, in dispatch order
    pub fn recorded(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Recorded events addressed to one user, in dispatch order
    pub fn events_for(&self, recipient: Uuid) -> Vec<ChannelEvent> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.recipient == recipient)
            .map(|n| n.event.clone())
            .collect()
    }

    /// Drop everything recorded so far
    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}
