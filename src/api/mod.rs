//! API Layer - REST surface for terminology, patients, and auth

pub mod auth;
pub mod codes;
pub mod middleware;
pub mod patients;

use std::sync::Arc;
use std::time::Duration;
use axum::{extract::Request, middleware::Next, routing::get, Extension, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::health::{HealthMonitor, SystemHealth};
use crate::patients::PatientStore;
use crate::terminology::CodeRegistry;

/// Tunables threaded from the server config into the middleware stack.
#[derive(Clone, Copy, Debug)]
pub struct ApiOptions {
    pub rate_limit_per_minute: usize,
    pub request_timeout_ms: u64,
    pub auth_required: bool,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 100,
            request_timeout_ms: 30000,
            auth_required: true,
        }
    }
}

/// Create the main API router
pub fn router(
    registry: Arc<CodeRegistry>,
    patient_store: Arc<PatientStore>,
    auth_state: auth::AuthState,
    health_monitor: Arc<HealthMonitor>,
    options: ApiOptions,
) -> Router {
    let rate_limiter = Arc::new(middleware::RateLimiter::new(options.rate_limit_per_minute, 60));
    let auth_required = options.auth_required;
    let request_timeout = Duration::from_millis(options.request_timeout_ms);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/ping", get(ping_handler))
        .nest("/api/codes", codes::routes())
        .nest("/api/patients", patients::routes())
        .nest("/api/auth", auth::routes())
        .layer(axum::middleware::from_fn(move |request: Request, next: Next| {
            middleware::auth_middleware(auth_required, request, next)
        }))
        // Timeout Layer (per-request budget from the server config)
        .layer(axum::middleware::from_fn(move |request: Request, next: Next| {
            middleware::timeout_middleware(request_timeout, request, next)
        }))
        // Rate Limit Layer (applied to all above)
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware))
        // Request ID tracking
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        // Global Extensions
        .layer(Extension(registry))
        .layer(Extension(patient_store))
        .layer(Extension(auth_state))
        .layer(Extension(health_monitor))
        .layer(Extension(rate_limiter))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_handler(Extension(monitor): Extension<Arc<HealthMonitor>>) -> Json<SystemHealth> {
    Json(monitor.check_all().await)
}

async fn ping_handler() -> Json<serde_json::Value> {
    let message = std::env::var("PING_MESSAGE").unwrap_or_else(|_| "pong".to_string());
    Json(serde_json::json!({ "message": message }))
}
