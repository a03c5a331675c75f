//! User repository
//!
//! Login reads users; writes happen only through the `seed-user` operator
//! tool and tests.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Create a user
    async fn create(&self, user: &User) -> Result<User>;

    /// Create the user, or replace the password hash and role when the
    /// username already exists. Used by the `seed-user` tool.
    async fn upsert(&self, user: &User) -> Result<User>;
}

/// SQLx-based user repository
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                get_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn upsert(&self, user: &User) -> Result<User> {
        if let Some(existing) = self.get_by_username(&user.username).await? {
            match self.pool.driver() {
                DatabaseDriver::Sqlite => {
                    update_credentials_sqlite(self.pool.as_sqlite().unwrap(), existing.id, user)
                        .await?
                }
                DatabaseDriver::Mysql => {
                    update_credentials_mysql(self.pool.as_mysql().unwrap(), existing.id, user)
                        .await?
                }
            }
            self.get_by_id(existing.id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("User not found after update"))
        } else {
            self.create(user).await
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    row.map(|r| row_to_user_sqlite(&r)).transpose()
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by id")?;

    row.map(|r| row_to_user_sqlite(&r)).transpose()
}

async fn create_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&role_str)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        username: user.username.clone(),
        password_hash: user.password_hash.clone(),
        role: user.role,
        created_at: now,
    })
}

async fn update_credentials_sqlite(pool: &SqlitePool, id: i64, user: &User) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, role = ? WHERE id = ?")
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user credentials")?;
    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    row.map(|r| row_to_user_mysql(&r)).transpose()
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by id")?;

    row.map(|r| row_to_user_mysql(&r)).transpose()
}

async fn create_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&role_str)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        username: user.username.clone(),
        password_hash: user.password_hash.clone(),
        role: user.role,
        created_at: now,
    })
}

async fn update_credentials_mysql(pool: &MySqlPool, id: i64, user: &User) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, role = ? WHERE id = ?")
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user credentials")?;
    Ok(())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: UserRole::from_str(&row.get::<String, _>("role"))?,
        created_at: row.get("created_at"),
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: UserRole::from_str(&row.get::<String, _>("role"))?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> Arc<dyn UserRepository> {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::boxed(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_by_username() {
        let repo = setup().await;
        let created = repo
            .create(&User::new("admin", "hash", UserRole::Admin))
            .await
            .unwrap();
        assert!(created.id > 0);

        let fetched = repo.get_by_username("admin").await.unwrap().expect("Should exist");
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_get_unknown_username() {
        let repo = setup().await;
        assert!(repo.get_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let repo = setup().await;
        repo.create(&User::new("admin", "h1", UserRole::Admin)).await.unwrap();
        let result = repo.create(&User::new("admin", "h2", UserRole::Viewer)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let repo = setup().await;

        let first = repo
            .upsert(&User::new("admin", "hash-1", UserRole::Viewer))
            .await
            .unwrap();
        let second = repo
            .upsert(&User::new("admin", "hash-2", UserRole::Admin))
            .await
            .unwrap();

        assert_eq!(first.id, second.id, "Upsert must not create a second row");
        assert_eq!(second.password_hash, "hash-2");
        assert_eq!(second.role, UserRole::Admin);
    }
}
