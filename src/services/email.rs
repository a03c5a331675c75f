//! Outbound alert mail
//!
//! The alert debouncer talks to a `Notifier` trait so tests can observe
//! dispatches without a mail server. The production implementation sends
//! over SMTP with lettre, building the transport per send — alert volume is
//! bounded by the per-room cooldown, so there is nothing to pool.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::MailConfig;

/// Delivery channel for humidity alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one humidity alert for a room.
    async fn send_humidity_alert(&self, room_name: &str, humidity: f64, threshold: f64)
        -> Result<()>;
}

/// SMTP-backed notifier.
pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_humidity_alert(
        &self,
        room_name: &str,
        humidity: f64,
        threshold: f64,
    ) -> Result<()> {
        if self.config.smtp_host.is_empty() {
            return Err(anyhow!(
                "SMTP host not configured; dropping alert for {}",
                room_name
            ));
        }

        let subject = format!("CRITICAL ALERT: high humidity in {}", room_name);
        let body = format!(
            "Humidity exceeded the configured threshold for {room_name}.\n\n\
             Current humidity: {humidity:.1}% (threshold: {threshold:.1}%)\n\n\
             Please check the area for potential leaks or equipment malfunction.\n\n\
             Alert sent at: {}",
            Utc::now().to_rfc3339()
        );

        let email = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(self
                .config
                .recipient
                .parse()
                .map_err(|e| anyhow!("Invalid recipient address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                .credentials(creds)
                .port(self.config.smtp_port)
                .build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}
