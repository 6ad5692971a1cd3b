//! Generation run API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use waypoint_core::{
    Caller, DayRange, GenerationError, Itinerary, ProgressSnapshot, RetryError, RunId,
    TripDuration, TripPreferences,
};

use super::handlers::ErrorResponse;
use super::middleware::UpstreamUser;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a run
#[derive(Debug, Deserialize)]
pub struct StartRunBody {
    pub preferences: TripPreferences,
    /// Free-text duration ("3 days", "2泊3日"), used when `preferences.duration`
    /// is left undecided.
    #[serde(default)]
    pub duration_text: Option<String>,
    /// Identity supplied by the upstream. Takes precedence over the
    /// `x-user-id` header.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: RunId,
}

/// Request body for retrying a day range
#[derive(Debug, Deserialize)]
pub struct RetryBody {
    pub start_day: u32,
    pub end_day: u32,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub retried: Vec<DayRange>,
}

fn closed() -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        ErrorResponse::new("generation coordinator is not running"),
    )
}

fn retry_error(e: RetryError) -> ApiError {
    let status = match e {
        RetryError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
        RetryError::CoordinatorClosed => return closed(),
        RetryError::NotGenerating { .. }
        | RetryError::NotFailed { .. }
        | RetryError::AttemptsExhausted { .. } => StatusCode::CONFLICT,
    };
    (status, ErrorResponse::new(e.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a new run. A run already in flight is abandoned.
pub async fn start_run(
    State(state): State<Arc<AppState>>,
    UpstreamUser(header_user): UpstreamUser,
    Json(body): Json<StartRunBody>,
) -> Result<(StatusCode, Json<StartRunResponse>), ApiError> {
    let mut preferences = body.preferences;
    if !preferences.duration.is_decided() {
        if let Some(text) = body.duration_text.as_deref() {
            preferences.duration = TripDuration::parse(text);
        }
    }

    let max_trip_days = state.generation_config().max_trip_days;
    if preferences.duration.days() > max_trip_days {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!(
                "Trip of {} days exceeds the {}-day limit",
                preferences.duration.days(),
                max_trip_days
            )),
        ));
    }

    let caller = match body.user_id.or(header_user) {
        Some(user_id) if !user_id.is_empty() => Caller::user(user_id),
        _ => Caller::anonymous(),
    };

    let run_id = state
        .generation()
        .start(preferences, caller)
        .await
        .map_err(|_| closed())?;
    info!("Accepted run {}", run_id);

    Ok((StatusCode::ACCEPTED, Json(StartRunResponse { run_id })))
}

/// Current progress snapshot. Never waits on running generation.
pub async fn get_current(State(state): State<Arc<AppState>>) -> Json<ProgressSnapshot> {
    Json(state.generation().progress())
}

/// Retry a range whose days all failed.
pub async fn retry_range(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RetryBody>,
) -> Result<(StatusCode, Json<RetryResponse>), ApiError> {
    let range = DayRange::new(body.start_day, body.end_day);
    state
        .generation()
        .retry(range)
        .await
        .map_err(retry_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RetryResponse {
            retried: vec![range],
        }),
    ))
}

/// Retry every failed range of the current run.
pub async fn retry_failed(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<RetryResponse>), ApiError> {
    let retried = state
        .generation()
        .retry_failed()
        .await
        .map_err(retry_error)?;

    Ok((StatusCode::ACCEPTED, Json(RetryResponse { retried })))
}

/// The merged itinerary, once the run completed.
pub async fn get_itinerary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Itinerary>, ApiError> {
    match state.generation().itinerary().await {
        Ok(Some(itinerary)) => Ok(Json(itinerary)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::new("no completed itinerary for the current run"),
        )),
        Err(_) => Err(closed()),
    }
}

/// Save the finished itinerary again after a failed save.
pub async fn retry_persistence(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    match state.generation().retry_persistence().await {
        Ok(()) => Ok(StatusCode::ACCEPTED),
        Err(GenerationError::PersistenceNotRetryable(reason)) => Err((
            StatusCode::CONFLICT,
            ErrorResponse::new(format!("Cannot retry persistence: {}", reason)),
        )),
        Err(GenerationError::CoordinatorClosed) => Err(closed()),
    }
}
