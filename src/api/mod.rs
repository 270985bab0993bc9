//! HTTP router for the estimator service.
//!
//! Mounts every endpoint under /api:
//! - /api/auth/jobber  - OAuth authorize + callback
//! - /api/jobber       - connection status, clients, quotes, introspection
//! - /api/estimate     - job pricing
//! - /api/health       - health check

pub mod routes;

use crate::SharedState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::api_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
