//! Saved plan API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::error;
use waypoint_core::persistence::StoredPlan;

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Get a saved plan by the reference handed out when it was persisted.
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Json<StoredPlan>, (StatusCode, Json<ErrorResponse>)> {
    match state.plans().lookup(&reference) {
        Ok(Some(plan)) => Ok(Json(plan)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Plan not found: {}", reference)),
        )),
        Err(e) => {
            error!("Failed to look up plan {}: {}", reference, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(e.to_string()),
            ))
        }
    }
}
