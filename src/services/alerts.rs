//! Humidity alert debouncer
//!
//! Tracks, per room, when the last alert email was dispatched and suppresses
//! re-dispatch until a configured cooldown has elapsed. The map lives in
//! process memory only: it starts empty, an absent entry means the room has
//! never alerted, and nothing evicts entries (the fleet of rooms is small
//! and static). A restart therefore forgets active cooldowns.
//!
//! The cooldown check and the timestamp update happen under one lock, so two
//! concurrent breaching readings for the same room cannot both dispatch.
//! Only the SMTP send itself runs as a detached task.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::Room;
use crate::services::email::Notifier;

/// Per-room debounced alert dispatch.
pub struct AlertService {
    /// Minimum interval between dispatches for one room
    cooldown: Duration,
    notifier: Arc<dyn Notifier>,
    /// room id -> time of the last attempted dispatch
    last_sent: Mutex<HashMap<i64, DateTime<Utc>>>,
}

impl AlertService {
    /// Create an alert service with the given cooldown in minutes.
    pub fn new(cooldown_minutes: i64, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            cooldown: Duration::minutes(cooldown_minutes),
            notifier,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluate a fresh reading against the room's humidity threshold.
    ///
    /// Returns whether an alert was dispatched on this call. Dispatch is
    /// fire-and-forget: the timestamp is recorded as soon as the send is
    /// attempted, so a failing mail transport cannot cause an alert storm.
    pub async fn evaluate(&self, room: &Room, humidity: f64) -> bool {
        self.evaluate_at(room, humidity, Utc::now()).await
    }

    /// `evaluate` with an explicit clock, for tests.
    pub async fn evaluate_at(&self, room: &Room, humidity: f64, now: DateTime<Utc>) -> bool {
        if humidity <= room.hum_threshold {
            // Below or at threshold: no dispatch, and the cooldown clock is
            // deliberately left untouched. A dip does not reset the window.
            return false;
        }

        let mut last_sent = self.last_sent.lock().await;

        let in_cooldown = match last_sent.get(&room.id) {
            Some(last) => now - *last <= self.cooldown,
            None => false,
        };

        if in_cooldown {
            tracing::debug!(
                room = %room.name,
                humidity,
                threshold = room.hum_threshold,
                "Humidity over threshold but alert is in cooldown"
            );
            return false;
        }

        // Record the attempt before the send resolves; an SMTP failure still
        // counts against the window.
        last_sent.insert(room.id, now);
        drop(last_sent);

        tracing::warn!(
            room = %room.name,
            humidity,
            threshold = room.hum_threshold,
            "Humidity over threshold, dispatching alert"
        );

        let notifier = self.notifier.clone();
        let room_name = room.name.clone();
        let threshold = room.hum_threshold;
        tokio::spawn(async move {
            if let Err(e) = notifier
                .send_humidity_alert(&room_name, humidity, threshold)
                .await
            {
                tracing::warn!(room = %room_name, error = %e, "Failed to send humidity alert");
            } else {
                tracing::info!(room = %room_name, "Humidity alert sent");
            }
        });

        true
    }

    /// Time of the last dispatch attempt for a room, if any.
    pub async fn last_dispatch(&self, room_id: i64) -> Option<DateTime<Utc>> {
        self.last_sent.lock().await.get(&room_id).copied()
    }
}
