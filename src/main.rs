//! Skill Swap Backend Server
//!
//! HTTP API for the skill-exchange marketplace: profiles and skill listings,
//! swap requests and their lifecycle, feedback, admin moderation and a
//! per-user real-time notification channel.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use skillswap_server::admin::{AdminService, ReportService};
use skillswap_server::auth::AuthService;
use skillswap_server::config::Config;
use skillswap_server::feedback::FeedbackService;
use skillswap_server::middleware::{
    rate_limit_layer, request_tracing, security_headers, RateLimiter,
};
use skillswap_server::notifications::{ChannelDispatcher, Mailer, NotificationDispatcher};
use skillswap_server::state::AppState;
use skillswap_server::swaps::SwapService;
use skillswap_server::users::UserService;
use skillswap_server::websocket::{ws_handler, ChannelRegistry};
use skillswap_server::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting Skill Swap server ({})", config.environment.as_str());

    let db_pool = db::create_pool(&config).await?;
    db::check_health(&db_pool).await?;

    // Notification plumbing: real-time channels plus best-effort email
    let channel_registry = ChannelRegistry::new();
    let mailer = Arc::new(Mailer::new(config.mail.clone()));
    let dispatcher: Arc<dyn NotificationDispatcher> =
        Arc::new(ChannelDispatcher::new(channel_registry.clone(), mailer));

    let auth_service = Arc::new(AuthService::new(
        db_pool.clone(),
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
    ));
    let user_service = Arc::new(UserService::new(db_pool.clone()));
    let swap_service = Arc::new(SwapService::new(db_pool.clone(), dispatcher.clone()));
    let feedback_service = Arc::new(FeedbackService::new(db_pool.clone(), dispatcher.clone()));
    let admin_service = Arc::new(AdminService::new(db_pool.clone(), dispatcher.clone()));
    let report_service = Arc::new(ReportService::new(db_pool.clone()));

    let app_state = AppState::new(
        auth_service,
        user_service,
        swap_service,
        feedback_service,
        admin_service,
        report_service,
        channel_registry,
    );

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);
    let limiter_janitor = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter_janitor
                .cleanup(std::time::Duration::from_secs(600))
                .await;
        }
    });

    let cors = configure_cors(config.cors_allowed_origins.as_deref());

    let health_db_pool = db_pool.clone();
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_db_pool.clone())))
        .route("/ws", get(ws_handler))
        .merge(routes::auth_routes())
        .merge(routes::user_routes())
        .merge(routes::swap_routes())
        .merge(routes::feedback_routes())
        .merge(routes::admin_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(security_headers))
        .layer(axum::middleware::from_fn(request_tracing))
        .layer(axum::middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_layer(limiter)(req, next)
        }))
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket available at ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn root() -> &'static str {
    "Skill Swap API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::PgPool) -> axum::Json<HealthResponse> {
    let db_status = match db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
