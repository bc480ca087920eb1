//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::admin::{AdminService, ReportService};
use crate::auth::AuthService;
use crate::feedback::FeedbackService;
use crate::swaps::SwapService;
use crate::users::UserService;
use crate::websocket::ChannelRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub swap_service: Arc<SwapService>,
    pub feedback_service: Arc<FeedbackService>,
    pub admin_service: Arc<AdminService>,
    pub report_service: Arc<ReportService>,
    pub channel_registry: ChannelRegistry,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth_service: Arc<AuthService>,
        user_service: Arc<UserService>,
        swap_service: Arc<SwapService>,
        feedback_service: Arc<FeedbackService>,
        admin_service: Arc<AdminService>,
        report_service: Arc<ReportService>,
        channel_registry: ChannelRegistry,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            swap_service,
            feedback_service,
            admin_service,
            report_service,
            channel_registry,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.user_service.clone()
    }
}

impl FromRef<AppState> for Arc<SwapService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.swap_service.clone()
    }
}

impl FromRef<AppState> for Arc<FeedbackService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.feedback_service.clone()
    }
}

impl FromRef<AppState> for Arc<AdminService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.admin_service.clone()
    }
}

impl FromRef<AppState> for Arc<ReportService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.report_service.clone()
    }
}

impl FromRef<AppState> for ChannelRegistry {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.channel_registry.clone()
    }
}
