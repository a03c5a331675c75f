//! Reading repository
//!
//! Append-only sensor reading storage plus the two dashboard queries:
//! latest reading per room (including rooms that never reported) and the
//! trailing-window history for one room.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Reading, RoomStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Reading repository trait
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Append a reading for a room.
    ///
    /// The timestamp is assigned here, at insert time.
    async fn insert(&self, room_id: i64, temperature: f64, humidity: f64) -> Result<Reading>;

    /// Every room joined with its most recent reading (or nulls),
    /// ordered by room id ascending.
    async fn latest_per_room(&self) -> Result<Vec<RoomStatus>>;

    /// Readings for one room within the trailing window, ascending by time.
    async fn in_window(&self, room_id: i64, window: Duration) -> Result<Vec<Reading>>;

    /// Number of stored readings (tests and diagnostics)
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based reading repository
pub struct SqlxReadingRepository {
    pool: DynDatabasePool,
}

impl SqlxReadingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReadingRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReadingRepository for SqlxReadingRepository {
    async fn insert(&self, room_id: i64, temperature: f64, humidity: f64) -> Result<Reading> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_sqlite(self.pool.as_sqlite().unwrap(), room_id, temperature, humidity).await
            }
            DatabaseDriver::Mysql => {
                insert_mysql(self.pool.as_mysql().unwrap(), room_id, temperature, humidity).await
            }
        }
    }

    async fn latest_per_room(&self) -> Result<Vec<RoomStatus>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => latest_per_room_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => latest_per_room_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn in_window(&self, room_id: i64, window: Duration) -> Result<Vec<Reading>> {
        let cutoff = Utc::now() - window;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                in_window_sqlite(self.pool.as_sqlite().unwrap(), room_id, cutoff).await
            }
            DatabaseDriver::Mysql => {
                in_window_mysql(self.pool.as_mysql().unwrap(), room_id, cutoff).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query("SELECT COUNT(*) as count FROM sensor_readings")
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to count readings")?;
                Ok(row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query("SELECT COUNT(*) as count FROM sensor_readings")
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to count readings")?;
                Ok(row.get("count"))
            }
        }
    }
}

/// Latest-per-room join: every room, LEFT JOINed against only its
/// most recent reading. Readings are append-only, so MAX(id) is the
/// newest row for a room.
const LATEST_PER_ROOM_SQL: &str = r#"
    SELECT
        r.id, r.name, r.device_mac, r.temp_threshold, r.hum_threshold,
        s.temperature, s.humidity, s.recorded_at
    FROM rooms r
    LEFT JOIN sensor_readings s ON r.id = s.room_id
    AND s.id = (
        SELECT MAX(id) FROM sensor_readings WHERE room_id = r.id
    )
    ORDER BY r.id ASC
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_sqlite(
    pool: &SqlitePool,
    room_id: i64,
    temperature: f64,
    humidity: f64,
) -> Result<Reading> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO sensor_readings (room_id, temperature, humidity, recorded_at) VALUES (?, ?, ?, ?)",
    )
    .bind(room_id)
    .bind(temperature)
    .bind(humidity)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to insert reading")?;

    Ok(Reading {
        id: result.last_insert_rowid(),
        room_id,
        temperature,
        humidity,
        recorded_at: now,
    })
}

async fn latest_per_room_sqlite(pool: &SqlitePool) -> Result<Vec<RoomStatus>> {
    let rows = sqlx::query(LATEST_PER_ROOM_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to query latest readings per room")?;

    Ok(rows
        .iter()
        .map(|row| RoomStatus {
            id: row.get("id"),
            name: row.get("name"),
            device_mac: row.get("device_mac"),
            temp_threshold: row.get("temp_threshold"),
            hum_threshold: row.get("hum_threshold"),
            temperature: row.get("temperature"),
            humidity: row.get("humidity"),
            recorded_at: row.get("recorded_at"),
        })
        .collect())
}

async fn in_window_sqlite(
    pool: &SqlitePool,
    room_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Reading>> {
    let rows = sqlx::query(
        r#"
        SELECT id, room_id, temperature, humidity, recorded_at
        FROM sensor_readings
        WHERE room_id = ? AND recorded_at >= ?
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(room_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .context("Failed to query reading history")?;

    Ok(rows
        .iter()
        .map(|row| Reading {
            id: row.get("id"),
            room_id: row.get("room_id"),
            temperature: row.get("temperature"),
            humidity: row.get("humidity"),
            recorded_at: row.get("recorded_at"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_mysql(
    pool: &MySqlPool,
    room_id: i64,
    temperature: f64,
    humidity: f64,
) -> Result<Reading> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO sensor_readings (room_id, temperature, humidity, recorded_at) VALUES (?, ?, ?, ?)",
    )
    .bind(room_id)
    .bind(temperature)
    .bind(humidity)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to insert reading")?;

    Ok(Reading {
        id: result.last_insert_id() as i64,
        room_id,
        temperature,
        humidity,
        recorded_at: now,
    })
}

async fn latest_per_room_mysql(pool: &MySqlPool) -> Result<Vec<RoomStatus>> {
    let rows = sqlx::query(LATEST_PER_ROOM_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to query latest readings per room")?;

    Ok(rows
        .iter()
        .map(|row| RoomStatus {
            id: row.get("id"),
            name: row.get("name"),
            device_mac: row.get("device_mac"),
            temp_threshold: row.get("temp_threshold"),
            hum_threshold: row.get("hum_threshold"),
            temperature: row.get("temperature"),
            humidity: row.get("humidity"),
            recorded_at: row.get("recorded_at"),
        })
        .collect())
}

async fn in_window_mysql(
    pool: &MySqlPool,
    room_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Reading>> {
    let rows = sqlx::query(
        r#"
        SELECT id, room_id, temperature, humidity, recorded_at
        FROM sensor_readings
        WHERE room_id = ? AND recorded_at >= ?
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(room_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .context("Failed to query reading history")?;

    Ok(rows
        .iter()
        .map(|row| Reading {
            id: row.get("id"),
            room_id: row.get("room_id"),
            temperature: row.get("temperature"),
            humidity: row.get("humidity"),
            recorded_at: row.get("recorded_at"),
        })
        .collect())
}
