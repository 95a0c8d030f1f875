//! Axum router configuration

use crate::{rest::handlers, AppState};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let api_v1 = Router::new()
        .route("/convert", post(handlers::convert))
        .route("/validate", post(handlers::validate))
        .route("/execute", post(handlers::execute))
        .route("/metrics", get(handlers::list_metrics));

    Router::new()
        .nest("/api/v1", api_v1)
        .route("/health", get(handlers::health))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configure CORS layer
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
