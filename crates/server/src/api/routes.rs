use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, plans, runs, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Generation runs
        .route("/runs", post(runs::start_run))
        .route("/runs/current", get(runs::get_current))
        .route("/runs/current/retry", post(runs::retry_range))
        .route("/runs/current/retry-failed", post(runs::retry_failed))
        .route("/runs/current/itinerary", get(runs::get_itinerary))
        .route("/runs/current/persist", post(runs::retry_persistence))
        // Saved plans
        .route("/plans/{reference}", get(plans::get_plan))
        // Live events
        .route("/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
