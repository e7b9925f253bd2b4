//! Route definitions for the admin API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Any origin may call the API, so reviewer tooling can be hosted elsewhere.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

/// Create the admin router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/queries", get(handlers::queries_list))
        .route("/queries/pending", get(handlers::queries_pending))
        .route("/queries/{id}", get(handlers::query_get))
        .route("/queries/{id}/approve", post(handlers::query_approve))
        .route("/queries/{id}/reject", post(handlers::query_reject))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
