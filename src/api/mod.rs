//! API layer - HTTP handlers and routing
//!
//! Endpoints:
//! - POST /api/data — device-authenticated sensor ingestion
//! - GET /api/dashboard — latest reading per active room
//! - GET /api/history/{room_id} — readings within a time window
//! - POST /api/login — user login, returns a session token
//! - GET /api/me — identity behind the presented token

pub mod auth;
pub mod dashboard;
pub mod ingest;
pub mod middleware;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Routes that need a valid session token
    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .route("/data", post(ingest::ingest_reading))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/history/{room_id}", get(dashboard::get_history))
        .route("/login", post(auth::login))
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin, allowing any origin");
            CorsLayer::permissive()
        }
    };

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
