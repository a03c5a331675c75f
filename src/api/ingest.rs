//! Sensor data ingestion endpoint

use axum::{extract::State, http::header::HeaderMap, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use super::middleware::{ApiError, AppState};
use crate::services::IngestError;

#[derive(Debug, Deserialize)]
pub struct SensorPayload {
    pub device_mac: Option<String>,
    pub temp: Option<f64>,
    pub hum: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub room_id: i64,
    pub room: String,
    pub alert_sent: bool,
}

/// POST /api/data
///
/// Devices authenticate with their MAC address in the body and their
/// key in the `x-api-key` header. Malformed submissions are rejected
/// before any credential lookup happens.
pub async fn ingest_reading(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SensorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let device_mac = payload
        .device_mac
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation_error("device_mac is required"))?;

    let temperature = payload
        .temp
        .ok_or_else(|| ApiError::validation_error("temp is required"))?;
    let humidity = payload
        .hum
        .ok_or_else(|| ApiError::validation_error("hum is required"))?;

    if !temperature.is_finite() || !humidity.is_finite() {
        return Err(ApiError::validation_error(
            "temp and hum must be finite numbers",
        ));
    }

    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation_error("x-api-key header is required"))?;

    let ack = state
        .ingest_service
        .ingest(device_mac, api_key, temperature, humidity)
        .await
        .map_err(|e| match e {
            IngestError::Unauthorized => ApiError::unauthorized("Invalid device credentials"),
            IngestError::InternalError(err) => {
                tracing::error!("Failed to ingest reading: {:#}", err);
                ApiError::internal_error()
            }
        })?;

    Ok(Json(IngestResponse {
        room_id: ack.room_id,
        room: ack.room_name,
        alert_sent: ack.alert_dispatched,
    }))
}
