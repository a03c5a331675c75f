//! Sensor reading models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single temperature/humidity sample for a room.
///
/// Readings are append-only: once written they are never updated, and the
/// store orders them by `recorded_at` within a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    /// Unique identifier
    pub id: i64,
    /// Room the reading belongs to
    pub room_id: i64,
    /// Temperature in °C
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Server-assigned timestamp, set at insert
    pub recorded_at: DateTime<Utc>,
}

/// A room's configuration joined with its most recent reading.
///
/// Rooms that have never reported appear with all reading fields `None`,
/// so the dashboard always shows one row per room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatus {
    pub id: i64,
    pub name: String,
    pub device_mac: String,
    pub temp_threshold: f64,
    pub hum_threshold: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_status_serializes_nulls_for_silent_room() {
        let status = RoomStatus {
            id: 3,
            name: "Meeting Room A".to_string(),
            device_mac: "DEV_003".to_string(),
            temp_threshold: 27.0,
            hum_threshold: 70.0,
            temperature: None,
            humidity: None,
            recorded_at: None,
        };

        let json = serde_json::to_value(&status).unwrap();
        assert!(json["temperature"].is_null());
        assert!(json["humidity"].is_null());
        assert!(json["recorded_at"].is_null());
        assert_eq!(json["name"], "Meeting Room A");
    }
}
