//! Create or update a dashboard user account.
//!
//! Usage: seed-user <username> <password> [role]
//!
//! The password is hashed before it touches the database. Running the
//! tool again for an existing username rotates the password in place.

use anyhow::{bail, Result};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomsense::{
    config::Config,
    db::{self, repositories::SqlxUserRepository},
    models::{User, UserRole},
    services::hash_password,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomsense=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        bail!("usage: {} <username> <password> [role]", args[0]);
    }

    let username = args[1].trim();
    let password = &args[2];
    let role: UserRole = match args.get(3) {
        Some(raw) => raw.parse()?,
        None => UserRole::Admin,
    };

    if username.is_empty() {
        bail!("username must not be empty");
    }
    if password.len() < 8 {
        bail!("password must be at least 8 characters");
    }

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let password_hash = hash_password(password)?;
    let users = SqlxUserRepository::boxed(pool);
    let user = users
        .upsert(&User::new(username, password_hash, role))
        .await?;

    tracing::info!(
        username = %user.username,
        role = %user.role,
        "User account ready"
    );

    Ok(())
}
