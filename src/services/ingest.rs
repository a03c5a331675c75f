//! Ingestion pipeline
//!
//! One logical transaction per reading, in strict order: authenticate the
//! device, persist the reading, then evaluate the room's humidity threshold.
//! A rejected authentication never reaches the insert, and a mail failure
//! never propagates back to the device.

use std::sync::Arc;

use crate::db::repositories::{ReadingRepository, RoomRepository};
use crate::services::alerts::AlertService;

/// Error types for the ingestion pipeline
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Unknown device, wrong key, or deactivated device — deliberately one
    /// variant, so responses cannot be used as a key-guessing oracle.
    #[error("Unauthorized: invalid API key or device")]
    Unauthorized,

    /// Datastore failure
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Acknowledgment for a stored reading.
#[derive(Debug, Clone)]
pub struct RoomAck {
    /// Room the reading was stored for
    pub room_id: i64,
    /// Room display name
    pub room_name: String,
    /// Whether this reading triggered an alert dispatch
    pub alert_dispatched: bool,
}

/// Device-facing ingestion service.
pub struct IngestService {
    rooms: Arc<dyn RoomRepository>,
    readings: Arc<dyn ReadingRepository>,
    alerts: Arc<AlertService>,
}

impl IngestService {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        readings: Arc<dyn ReadingRepository>,
        alerts: Arc<AlertService>,
    ) -> Self {
        Self {
            rooms,
            readings,
            alerts,
        }
    }

    /// Authenticate a device and store its reading.
    ///
    /// The caller has already checked that `device_mac` and `api_key` are
    /// non-empty; empty credentials are a client error, not an
    /// authentication failure.
    pub async fn ingest(
        &self,
        device_mac: &str,
        api_key: &str,
        temperature: f64,
        humidity: f64,
    ) -> Result<RoomAck, IngestError> {
        let room = match self.rooms.find_by_credentials(device_mac, api_key).await? {
            Some(room) => room,
            None => {
                // Audit trail: device identifier only, never the key
                tracing::warn!(device_mac, "Unauthorized ingestion attempt");
                return Err(IngestError::Unauthorized);
            }
        };

        let reading = self.readings.insert(room.id, temperature, humidity).await?;

        tracing::info!(
            room = %room.name,
            temperature,
            humidity,
            reading_id = reading.id,
            "Reading stored"
        );

        let alert_dispatched = self.alerts.evaluate(&room, humidity).await;

        Ok(RoomAck {
            room_id: room.id,
            room_name: room.name,
            alert_dispatched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxReadingRepository, SqlxRoomRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Room;
    use crate::services::email::Notifier;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier(AtomicUsize);

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send_humidity_alert(&self, _r: &str, _h: f64, _t: f64) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn setup() -> (IngestService, Arc<dyn ReadingRepository>, Arc<CountingNotifier>) {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let rooms = SqlxRoomRepository::boxed(pool.clone());
        rooms
            .create(&Room::new("Server Room", "DEV_001", "key_server_001", 24.0, 90.0))
            .await
            .expect("Failed to seed room");

        let readings = SqlxReadingRepository::boxed(pool);
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let alerts = Arc::new(AlertService::new(30, notifier.clone()));

        (
            IngestService::new(rooms, readings.clone(), alerts),
            readings,
            notifier,
        )
    }

    #[tokio::test]
    async fn test_valid_reading_is_stored() {
        let (service, readings, _) = setup().await;

        let ack = service
            .ingest("DEV_001", "key_server_001", 22.5, 61.0)
            .await
            .expect("Ingest should succeed");

        assert_eq!(ack.room_name, "Server Room");
        assert!(!ack.alert_dispatched);
        assert_eq!(readings.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_device_writes_no_row() {
        let (service, readings, _) = setup().await;

        let result = service.ingest("DEV_999", "any_key", 22.5, 61.0).await;
        assert!(matches!(result, Err(IngestError::Unauthorized)));
        assert_eq!(readings.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wrong_key_writes_no_row() {
        let (service, readings, _) = setup().await;

        let result = service.ingest("DEV_001", "wrong_key", 22.5, 61.0).await;
        assert!(matches!(result, Err(IngestError::Unauthorized)));
        assert_eq!(readings.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_breaching_reading_dispatches_alert() {
        let (service, readings, notifier) = setup().await;

        let ack = service
            .ingest("DEV_001", "key_server_001", 22.5, 95.0)
            .await
            .expect("Ingest should succeed");

        assert!(ack.alert_dispatched);
        assert_eq!(readings.count().await.unwrap(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_breach_is_debounced_but_still_stored() {
        let (service, readings, notifier) = setup().await;

        let first = service.ingest("DEV_001", "key_server_001", 22.5, 95.0).await.unwrap();
        let second = service.ingest("DEV_001", "key_server_001", 22.5, 96.0).await.unwrap();

        assert!(first.alert_dispatched);
        assert!(!second.alert_dispatched, "Within cooldown");
        assert_eq!(readings.count().await.unwrap(), 2, "Both readings persist");

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }
}
