//! Room repository
//!
//! Read access to room records, including the device credential check used
//! by the ingestion pipeline. Rooms are written only by operator tooling
//! and tests (`create`), never by request handlers.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Room;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Room repository trait
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find the active room matching a device MAC and API key.
    ///
    /// Returns `None` for unknown device, wrong key, and inactive device
    /// alike; callers must not be able to tell these apart.
    async fn find_by_credentials(&self, device_mac: &str, api_key: &str) -> Result<Option<Room>>;

    /// Get a room by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Room>>;

    /// List all rooms ordered by id
    async fn list(&self) -> Result<Vec<Room>>;

    /// Create a room (operator tooling and tests only)
    async fn create(&self, room: &Room) -> Result<Room>;
}

/// SQLx-based room repository
pub struct SqlxRoomRepository {
    pool: DynDatabasePool,
}

impl SqlxRoomRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RoomRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RoomRepository for SqlxRoomRepository {
    async fn find_by_credentials(&self, device_mac: &str, api_key: &str) -> Result<Option<Room>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_by_credentials_sqlite(self.pool.as_sqlite().unwrap(), device_mac, api_key)
                    .await
            }
            DatabaseDriver::Mysql => {
                find_by_credentials_mysql(self.pool.as_mysql().unwrap(), device_mac, api_key).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Room>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Room>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn create(&self, room: &Room) -> Result<Room> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), room).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), room).await,
        }
    }
}

const ROOM_COLUMNS: &str =
    "id, name, device_mac, api_key, temp_threshold, hum_threshold, is_active";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn find_by_credentials_sqlite(
    pool: &SqlitePool,
    device_mac: &str,
    api_key: &str,
) -> Result<Option<Room>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM rooms WHERE device_mac = ? AND api_key = ? AND is_active = 1",
        ROOM_COLUMNS
    ))
    .bind(device_mac)
    .bind(api_key)
    .fetch_optional(pool)
    .await
    .context("Failed to look up device credentials")?;

    row.map(|r| row_to_room_sqlite(&r)).transpose()
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Room>> {
    let row = sqlx::query(&format!("SELECT {} FROM rooms WHERE id = ?", ROOM_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get room by id")?;

    row.map(|r| row_to_room_sqlite(&r)).transpose()
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Room>> {
    let rows = sqlx::query(&format!("SELECT {} FROM rooms ORDER BY id ASC", ROOM_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list rooms")?;

    rows.iter().map(row_to_room_sqlite).collect()
}

async fn create_sqlite(pool: &SqlitePool, room: &Room) -> Result<Room> {
    let result = sqlx::query(
        r#"
        INSERT INTO rooms (name, device_mac, api_key, temp_threshold, hum_threshold, is_active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&room.name)
    .bind(&room.device_mac)
    .bind(&room.api_key)
    .bind(room.temp_threshold)
    .bind(room.hum_threshold)
    .bind(room.is_active)
    .execute(pool)
    .await
    .context("Failed to create room")?;

    Ok(Room {
        id: result.last_insert_rowid(),
        ..room.clone()
    })
}

fn row_to_room_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Room> {
    Ok(Room {
        id: row.get("id"),
        name: row.get("name"),
        device_mac: row.get("device_mac"),
        api_key: row.get("api_key"),
        temp_threshold: row.get("temp_threshold"),
        hum_threshold: row.get("hum_threshold"),
        is_active: row.get::<i64, _>("is_active") != 0,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn find_by_credentials_mysql(
    pool: &MySqlPool,
    device_mac: &str,
    api_key: &str,
) -> Result<Option<Room>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM rooms WHERE device_mac = ? AND api_key = ? AND is_active = 1",
        ROOM_COLUMNS
    ))
    .bind(device_mac)
    .bind(api_key)
    .fetch_optional(pool)
    .await
    .context("Failed to look up device credentials")?;

    row.map(|r| row_to_room_mysql(&r)).transpose()
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Room>> {
    let row = sqlx::query(&format!("SELECT {} FROM rooms WHERE id = ?", ROOM_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get room by id")?;

    row.map(|r| row_to_room_mysql(&r)).transpose()
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Room>> {
    let rows = sqlx::query(&format!("SELECT {} FROM rooms ORDER BY id ASC", ROOM_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list rooms")?;

    rows.iter().map(row_to_room_mysql).collect()
}

async fn create_mysql(pool: &MySqlPool, room: &Room) -> Result<Room> {
    let result = sqlx::query(
        r#"
        INSERT INTO rooms (name, device_mac, api_key, temp_threshold, hum_threshold, is_active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&room.name)
    .bind(&room.device_mac)
    .bind(&room.api_key)
    .bind(room.temp_threshold)
    .bind(room.hum_threshold)
    .bind(room.is_active)
    .execute(pool)
    .await
    .context("Failed to create room")?;

    Ok(Room {
        id: result.last_insert_id() as i64,
        ..room.clone()
    })
}

fn row_to_room_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Room> {
    Ok(Room {
        id: row.get("id"),
        name: row.get("name"),
        device_mac: row.get("device_mac"),
        api_key: row.get("api_key"),
        temp_threshold: row.get("temp_threshold"),
        hum_threshold: row.get("hum_threshold"),
        is_active: row.get::<i8, _>("is_active") != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> Arc<dyn RoomRepository> {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxRoomRepository::boxed(pool)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup().await;
        let room = repo
            .create(&Room::new("Server Room", "DEV_001", "key_server_001", 24.0, 90.0))
            .await
            .expect("Failed to create room");

        assert!(room.id > 0);
        let fetched = repo.get_by_id(room.id).await.unwrap().expect("Room should exist");
        assert_eq!(fetched.name, "Server Room");
        assert_eq!(fetched.hum_threshold, 90.0);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_find_by_credentials_matches_active_room() {
        let repo = setup().await;
        repo.create(&Room::new("Server Room", "DEV_001", "key_server_001", 24.0, 90.0))
            .await
            .unwrap();

        let found = repo
            .find_by_credentials("DEV_001", "key_server_001")
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().name, "Server Room");
    }

    #[tokio::test]
    async fn test_find_by_credentials_wrong_key() {
        let repo = setup().await;
        repo.create(&Room::new("Server Room", "DEV_001", "key_server_001", 24.0, 90.0))
            .await
            .unwrap();

        let found = repo.find_by_credentials("DEV_001", "wrong_key").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_by_credentials_unknown_device() {
        let repo = setup().await;
        let found = repo.find_by_credentials("DEV_999", "any_key").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_by_credentials_inactive_device() {
        let repo = setup().await;
        let mut room = Room::new("Storage", "DEV_010", "key_storage", 24.0, 90.0);
        room.is_active = false;
        repo.create(&room).await.unwrap();

        let found = repo.find_by_credentials("DEV_010", "key_storage").await.unwrap();
        assert!(found.is_none(), "Inactive rooms must not authenticate");
    }

    #[tokio::test]
    async fn test_list_ordered_by_id() {
        let repo = setup().await;
        repo.create(&Room::new("B", "DEV_002", "k2", 28.0, 70.0)).await.unwrap();
        repo.create(&Room::new("A", "DEV_001", "k1", 24.0, 90.0)).await.unwrap();

        let rooms = repo.list().await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert!(rooms[0].id < rooms[1].id);
    }
}
