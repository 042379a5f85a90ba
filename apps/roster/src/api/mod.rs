//! # Roster HTTP API Module
//!
//! The HTTP REST API server, built on axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Row counts
//! - `GET|POST /api/students`, `GET|PUT|DELETE /api/students/{id}`
//! - `POST /api/students/enroll?studentId=&sectionId=` - Enroll a student
//! - `DELETE /api/students/{id}/sections/{sectionId}` - Withdraw a student
//! - `GET|POST /api/subjects`, `GET|PUT|DELETE /api/subjects/{id}`
//! - `GET|POST /api/sections`, `GET|PUT|DELETE /api/sections/{id}`
//!
//! CORS origins, the rate limit and the API key come from
//! [`SecurityConfig`](crate::config::SecurityConfig).

mod auth;
mod handlers;
mod middleware;
mod types;

pub use handlers::ApiError;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    EnrollParams, HealthResponse, MessageResponse, SectionJson, SectionRequest, StatusResponse,
    StudentDetailResponse, StudentJson, StudentRequest, StudentSummaryJson, SubjectJson,
    SubjectRequest,
};

use crate::AppError;
use crate::config::SecurityConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use roster_core::Roster;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request bodies larger than this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// Every mutating handler holds the write lock for its whole operation, so
/// two enrollments of one student can never interleave.
#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<RwLock<Roster>>,
}

impl AppState {
    #[must_use]
    pub fn new(roster: Roster) -> Self {
        Self {
            roster: Arc::new(RwLock::new(roster)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: any origin
/// - empty: localhost only
/// - otherwise: exactly the listed origins
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// The registrar frontend runs on port 3000 during development.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if a key is configured)
pub fn create_router(state: AppState, security: &SecurityConfig) -> Router {
    let cors = build_cors_layer(&security.cors_origins);

    let rate_limiter = create_rate_limiter(security.rate_limit);
    match rate_limiter {
        Some(_) => tracing::info!(
            "Rate limiting enabled: {} requests/second",
            security.rate_limit
        ),
        None => tracing::info!("Rate limiting disabled"),
    }

    let api_key: Option<auth::ApiKey> = security.api_key.as_deref().map(Arc::from);
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set ROSTER_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/api/students",
            get(handlers::list_students_handler).post(handlers::create_student_handler),
        )
        .route("/api/students/enroll", post(handlers::enroll_handler))
        .route(
            "/api/students/{id}",
            get(handlers::get_student_handler)
                .put(handlers::update_student_handler)
                .delete(handlers::delete_student_handler),
        )
        .route(
            "/api/students/{id}/sections/{section_id}",
            delete(handlers::withdraw_handler),
        )
        .route(
            "/api/subjects",
            get(handlers::list_subjects_handler).post(handlers::create_subject_handler),
        )
        .route(
            "/api/subjects/{id}",
            get(handlers::get_subject_handler)
                .put(handlers::update_subject_handler)
                .delete(handlers::delete_subject_handler),
        )
        .route(
            "/api/sections",
            get(handlers::list_sections_handler).post(handlers::create_section_handler),
        )
        .route(
            "/api/sections/{id}",
            get(handlers::get_section_handler)
                .put(handlers::update_section_handler)
                .delete(handlers::delete_section_handler),
        );

    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until Ctrl+C.
pub async fn run_server(
    addr: &str,
    roster: Roster,
    security: &SecurityConfig,
) -> Result<(), AppError> {
    let router = create_router(AppState::new(roster), security);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Roster HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
