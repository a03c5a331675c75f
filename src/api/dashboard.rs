//! Dashboard and history query endpoints

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use serde::Deserialize;

use super::middleware::{ApiError, AppState};

const DEFAULT_HISTORY_HOURS: i64 = 24;
const MAX_HISTORY_HOURS: i64 = 24 * 7;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub hours: Option<i64>,
}

/// GET /api/dashboard
///
/// One row per active room with its most recent reading, or nulls when
/// the room has never reported.
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let rooms = state.reading_repo.latest_per_room().await.map_err(|e| {
        tracing::error!("Failed to load dashboard: {:#}", e);
        ApiError::internal_error()
    })?;

    Ok(Json(rooms))
}

/// GET /api/history/{room_id}?hours=N
pub async fn get_history(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = params.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    if hours < 1 || hours > MAX_HISTORY_HOURS {
        return Err(ApiError::validation_error(format!(
            "hours must be between 1 and {}",
            MAX_HISTORY_HOURS
        )));
    }

    let readings = state
        .reading_repo
        .in_window(room_id, Duration::hours(hours))
        .await
        .map_err(|e| {
            tracing::error!(room_id, "Failed to load history: {:#}", e);
            ApiError::internal_error()
        })?;

    Ok(Json(readings))
}
