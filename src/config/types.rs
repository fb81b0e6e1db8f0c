use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Fallback socket timeout when `socket_timeout` does not parse.
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 5000;

/// Root configuration for smsdispatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Gateways in selection order
    #[serde(default)]
    pub gateways: Vec<GatewayConfig>,

    /// Alert email settings
    #[serde(default)]
    pub alert: AlertConfig,

    /// Failure window and cooldown tuning
    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Response sentinels returned to the caller
    #[serde(default)]
    pub responses: ResponseConfig,

    /// Logging settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// A physical SMS gateway.
///
/// Numeric fields are kept as written in the file; see the accessor
/// methods for their resolved values.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Host name or IP address
    pub address: String,

    /// TCP port
    #[serde(with = "lenient_string")]
    pub port: String,

    /// Shared secret sent at login
    pub password: String,

    /// Connect and read/write timeout in milliseconds
    #[serde(default, with = "lenient_string")]
    pub socket_timeout: String,

    /// Number of SIMs, used as selection weight
    #[serde(default, with = "lenient_string")]
    pub number_of_sims: String,

    /// Subject of the alert email for this gateway
    #[serde(default)]
    pub email_subject: String,

    /// Body of the alert email for this gateway
    #[serde(default)]
    pub email_msg: String,
}

impl GatewayConfig {
    /// `host:port` of the gateway.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Socket timeout, 5000ms when unset, unparsable or zero.
    pub fn timeout(&self) -> Duration {
        let millis = self
            .socket_timeout
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SOCKET_TIMEOUT_MS);
        Duration::from_millis(millis)
    }

    /// Declared capacity, `None` when it does not parse.
    pub fn capacity(&self) -> Option<u32> {
        self.number_of_sims.trim().parse::<u32>().ok()
    }
}

/// Alert email configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertConfig {
    /// SMTP server host
    #[serde(default)]
    pub smtp_server: String,

    /// SMTP server port
    #[serde(default, with = "lenient_string")]
    pub smtp_server_port: String,

    /// SMTP password
    #[serde(default)]
    pub email_password: String,

    /// Sender address
    #[serde(default)]
    pub email_from: String,

    /// Comma separated recipients
    #[serde(default)]
    pub email_to: String,
}

/// Sustained failure detection settings
#[derive(Debug, Clone, Deserialize)]
pub struct AlertingConfig {
    /// Number of failure timestamps kept per gateway
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    /// All recorded failures must fall inside this period to alert
    #[serde(default = "default_check_period", with = "humantime_serde")]
    pub check_period: Duration,

    /// Minimum time between two alerts for the same gateway
    #[serde(default = "default_cooldown", with = "humantime_serde")]
    pub cooldown: Duration,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            history_len: default_history_len(),
            check_period: default_check_period(),
            cooldown: default_cooldown(),
        }
    }
}

fn default_history_len() -> usize {
    20
}

fn default_check_period() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_cooldown() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Sentinel bodies handed back to the caller
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseConfig {
    #[serde(default = "default_success_response")]
    pub success: String,

    #[serde(default = "default_failure_response")]
    pub failure: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            success: default_success_response(),
            failure: default_failure_response(),
        }
    }
}

fn default_success_response() -> String {
    "returnSendSms=success".to_string()
}

fn default_failure_response() -> String {
    "returnSendSms=failed".to_string()
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable structured JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Prometheus text file written after each run (node_exporter textfile collector)
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            metrics_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Humantime serde support module
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Accepts a YAML string or number and keeps it as a string.
mod lenient_string {
    use serde::{self, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s,
            Raw::Int(i) => i.to_string(),
            Raw::Float(f) => f.to_string(),
        })
    }
}
