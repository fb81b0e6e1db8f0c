//! Operator alerts for gateways that stay unreachable.
//!
//! The dispatcher decides *when* an alert is due; delivering it is left to
//! an [`AlertNotifier`]. [`LogNotifier`] is the shipped transport and
//! writes the full email envelope to the log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::AlertConfig;

/// A sustained failure alert for one gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Gateway address (host:port)
    pub gateway: String,

    /// Subject configured for the gateway
    pub subject: String,

    /// Body configured for the gateway
    pub body: String,

    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

/// Alert delivery errors.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert transport failed: {0}")]
    Transport(String),
}

/// Delivers alerts.
///
/// Returning `Ok` means the alert counts as sent and starts the cooldown.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Name of this transport, for logs.
    fn name(&self) -> &'static str;

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// SMTP envelope parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_server_port: String,
    pub password: String,
    pub from: String,
    /// Recipients as configured, comma separated
    pub to: String,
    /// Non-empty recipients parsed from `to`
    pub recipients: Vec<String>,
}

impl EmailSettings {
    pub fn from_config(config: &AlertConfig) -> Self {
        Self {
            smtp_server: config.smtp_server.clone(),
            smtp_server_port: config.smtp_server_port.clone(),
            password: config.email_password.clone(),
            from: config.email_from.clone(),
            to: config.email_to.clone(),
            recipients: parse_recipients(&config.email_to),
        }
    }

    /// `host:port` of the SMTP server.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.smtp_server, self.smtp_server_port)
    }

    pub fn has_recipients(&self) -> bool {
        !self.recipients.is_empty()
    }

    /// RFC 5322 message for an alert.
    pub fn render(&self, alert: &Alert) -> String {
        format!(
            "To: {}\r\nSubject: {}\r\n\r\n{}\r\n",
            self.to, alert.subject, alert.body
        )
    }
}

/// Split a comma separated recipient list, ignoring blanks.
pub fn parse_recipients(to: &str) -> Vec<String> {
    to.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Writes alerts to the log at error level.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    settings: EmailSettings,
}

impl LogNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EmailSettings {
        &self.settings
    }
}

#[async_trait]
impl AlertNotifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        if !self.settings.has_recipients() {
            debug!(gateway = %alert.gateway, "no alert recipients configured, skipping");
            return Ok(());
        }

        error!(
            gateway = %alert.gateway,
            raised_at = %alert.raised_at.to_rfc3339(),
            smtp_server = %self.settings.server_address(),
            from = %self.settings.from,
            to = ?self.settings.recipients,
            subject = %alert.subject,
            body = %alert.body,
            "gateway alert"
        );

        Ok(())
    }
}
