//! API layer - HTTP handlers and routing
//!
//! - Public Logue endpoints (listings, page detail, tag filter, search, snippets)
//! - Admin endpoints (content CRUD, publishing, block schema)

pub mod admin;
pub mod common;
pub mod logue;
pub mod middleware;
pub mod responses;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_admin_token,
        ));

    Router::new().merge(logue::router()).merge(admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!(
            "Invalid CORS origin '{}', cross-origin requests will be refused",
            cors_origin
        ),
    }

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
