//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file and then overridden by
//! `ROOMSENSE_*` environment variables, so deployments can inject secrets
//! (SMTP password, token signing secret, database URL) without writing them
//! to disk. Missing optional values fall back to sensible defaults; the
//! token signing secret has no default and must always be supplied.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Outbound mail configuration
    #[serde(default)]
    pub mail: MailConfig,
    /// Alerting configuration
    #[serde(default)]
    pub alert: AlertConfig,
    /// Session token configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin for the dashboard frontend
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/roomsense.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default, single-binary installs and tests)
    #[default]
    Sqlite,
    /// MySQL / MariaDB
    Mysql,
}

/// Outbound mail (SMTP) configuration
///
/// When `smtp_host` is empty, alert delivery is disabled and breaches are
/// only logged. The cooldown bookkeeping still runs, so enabling mail later
/// does not change alert timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host
    #[serde(default)]
    pub smtp_host: String,
    /// SMTP port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password
    #[serde(default)]
    pub smtp_password: String,
    /// From address for alert mail
    #[serde(default)]
    pub from: String,
    /// Recipient address for alert mail
    #[serde(default)]
    pub recipient: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from: String::new(),
            recipient: String::new(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minimum time between alert emails for the same room, in minutes
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: default_cooldown_minutes(),
        }
    }
}

fn default_cooldown_minutes() -> i64 {
    30
}

/// Session token configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens.
    ///
    /// Deliberately has no default: the server refuses to start when this
    /// is empty. Supply it via config.yml or `ROOMSENSE_AUTH_TOKEN_SECRET`.
    #[serde(default)]
    pub token_secret: String,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing or empty file yields the defaults; invalid YAML is an error
    /// with the location included.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides.
    ///
    /// Recognized variables:
    /// - `ROOMSENSE_SERVER_HOST` / `ROOMSENSE_SERVER_PORT` / `ROOMSENSE_SERVER_CORS_ORIGIN`
    /// - `ROOMSENSE_DATABASE_DRIVER` / `ROOMSENSE_DATABASE_URL`
    /// - `ROOMSENSE_MAIL_SMTP_HOST` / `ROOMSENSE_MAIL_SMTP_PORT`
    /// - `ROOMSENSE_MAIL_SMTP_USERNAME` / `ROOMSENSE_MAIL_SMTP_PASSWORD`
    /// - `ROOMSENSE_MAIL_FROM` / `ROOMSENSE_MAIL_RECIPIENT`
    /// - `ROOMSENSE_ALERT_COOLDOWN_MINUTES`
    /// - `ROOMSENSE_AUTH_TOKEN_SECRET`
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ROOMSENSE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ROOMSENSE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("ROOMSENSE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("ROOMSENSE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("ROOMSENSE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(host) = std::env::var("ROOMSENSE_MAIL_SMTP_HOST") {
            self.mail.smtp_host = host;
        }
        if let Ok(port) = std::env::var("ROOMSENSE_MAIL_SMTP_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.mail.smtp_port = port;
            }
        }
        if let Ok(username) = std::env::var("ROOMSENSE_MAIL_SMTP_USERNAME") {
            self.mail.smtp_username = username;
        }
        if let Ok(password) = std::env::var("ROOMSENSE_MAIL_SMTP_PASSWORD") {
            self.mail.smtp_password = password;
        }
        if let Ok(from) = std::env::var("ROOMSENSE_MAIL_FROM") {
            self.mail.from = from;
        }
        if let Ok(recipient) = std::env::var("ROOMSENSE_MAIL_RECIPIENT") {
            self.mail.recipient = recipient;
        }

        if let Ok(minutes) = std::env::var("ROOMSENSE_ALERT_COOLDOWN_MINUTES") {
            if let Ok(minutes) = minutes.parse::<i64>() {
                self.alert.cooldown_minutes = minutes;
            }
        }

        if let Ok(secret) = std::env::var("ROOMSENSE_AUTH_TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, OnceLock};

    // Env vars are process-global; tests that touch them must not interleave.
    static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clear_env() {
        for var in [
            "ROOMSENSE_SERVER_HOST",
            "ROOMSENSE_SERVER_PORT",
            "ROOMSENSE_SERVER_CORS_ORIGIN",
            "ROOMSENSE_DATABASE_DRIVER",
            "ROOMSENSE_DATABASE_URL",
            "ROOMSENSE_MAIL_SMTP_HOST",
            "ROOMSENSE_MAIL_SMTP_PORT",
            "ROOMSENSE_MAIL_SMTP_USERNAME",
            "ROOMSENSE_MAIL_SMTP_PASSWORD",
            "ROOMSENSE_MAIL_FROM",
            "ROOMSENSE_MAIL_RECIPIENT",
            "ROOMSENSE_ALERT_COOLDOWN_MINUTES",
            "ROOMSENSE_AUTH_TOKEN_SECRET",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.alert.cooldown_minutes, 30);
        assert_eq!(config.mail.smtp_port, 587);
        assert!(config.auth.token_secret.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(std::path::Path::new("does-not-exist.yml"))
            .expect("Missing file should yield defaults");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::load(file.path()).expect("Empty file should yield defaults");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 9000\nalert:\n  cooldown_minutes: 10"
        )
        .unwrap();

        let config = Config::load(file.path()).expect("Failed to load config");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.alert.cooldown_minutes, 10);
        // Unspecified sections keep their defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not a mapping").unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("ROOMSENSE_SERVER_PORT", "8081");
        std::env::set_var("ROOMSENSE_DATABASE_DRIVER", "mysql");
        std::env::set_var("ROOMSENSE_DATABASE_URL", "mysql://app@db/office_iot");
        std::env::set_var("ROOMSENSE_ALERT_COOLDOWN_MINUTES", "5");
        std::env::set_var("ROOMSENSE_AUTH_TOKEN_SECRET", "test-secret");

        let config = Config::load_with_env(std::path::Path::new("does-not-exist.yml")).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.database.url, "mysql://app@db/office_iot");
        assert_eq!(config.alert.cooldown_minutes, 5);
        assert_eq!(config.auth.token_secret, "test-secret");

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("ROOMSENSE_SERVER_PORT", "not-a-port");
        std::env::set_var("ROOMSENSE_DATABASE_DRIVER", "postgres");

        let config = Config::load_with_env(std::path::Path::new("does-not-exist.yml")).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);

        clear_env();
    }

    #[test]
    fn test_mail_env_overrides() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("ROOMSENSE_MAIL_SMTP_HOST", "smtp.example.com");
        std::env::set_var("ROOMSENSE_MAIL_SMTP_USERNAME", "alerts@example.com");
        std::env::set_var("ROOMSENSE_MAIL_RECIPIENT", "facilities@example.com");

        let config = Config::load_with_env(std::path::Path::new("does-not-exist.yml")).unwrap();
        assert_eq!(config.mail.smtp_host, "smtp.example.com");
        assert_eq!(config.mail.smtp_username, "alerts@example.com");
        assert_eq!(config.mail.recipient, "facilities@example.com");

        clear_env();
    }
}
