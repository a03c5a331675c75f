//! Room model
//!
//! A room couples a physical location with the single sensor device assigned
//! to it. Rooms are provisioned out-of-band (by an operator, directly in the
//! database); the service itself only ever reads them.

use serde::{Deserialize, Serialize};

/// A monitored room and its assigned sensor device.
///
/// The `device_mac` + `api_key` pair is the device's credential: at most one
/// active room matches a given pair. `api_key` is never serialized into API
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier
    pub id: i64,
    /// Display name, e.g. "Server Room"
    pub name: String,
    /// MAC address of the assigned sensor device
    pub device_mac: String,
    /// Shared secret the device presents with every reading
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Temperature alert threshold in °C
    pub temp_threshold: f64,
    /// Humidity alert threshold in percent relative humidity
    pub hum_threshold: f64,
    /// Whether the device may submit readings
    pub is_active: bool,
}

impl Room {
    /// Create a room with the given credentials and thresholds.
    ///
    /// The id is assigned by the database on insert.
    pub fn new(
        name: impl Into<String>,
        device_mac: impl Into<String>,
        api_key: impl Into<String>,
        temp_threshold: f64,
        hum_threshold: f64,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            device_mac: device_mac.into(),
            api_key: api_key.into(),
            temp_threshold,
            hum_threshold,
            is_active: true,
        }
    }
}
