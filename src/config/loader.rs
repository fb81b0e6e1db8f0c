use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::types::Config;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.gateways.is_empty() {
            anyhow::bail!("at least one gateway must be defined");
        }

        for (index, gateway) in self.gateways.iter().enumerate() {
            if gateway.address.trim().is_empty() {
                anyhow::bail!("gateway {} has an empty address", index);
            }
            if gateway.port.trim().is_empty() {
                anyhow::bail!("gateway {} ({}) has an empty port", index, gateway.address);
            }

            match gateway.capacity() {
                Some(0) | None => warn!(
                    gateway = %gateway.endpoint(),
                    number_of_sims = %gateway.number_of_sims,
                    "gateway capacity is not a positive integer, it will never be selected"
                ),
                Some(_) => {}
            }

            if gateway.socket_timeout.trim() == "0" {
                warn!(
                    gateway = %gateway.endpoint(),
                    "socket_timeout of 0 would fail every connect, using the 5000ms default"
                );
            }
        }

        if self.responses.success == self.responses.failure {
            anyhow::bail!("success and failure responses must differ");
        }

        if self.alerting.history_len == 0 {
            anyhow::bail!("alerting history_len must be at least 1");
        }

        info!(gateways = self.gateways.len(), "configuration validated successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const MINIMAL: &str = r#"
gateways:
  - address: "10.0.0.5"
    port: 10001
    password: admin
    socket_timeout: "3000"
    number_of_sims: 8
    email_subject: "Gateway 1 down"
    email_msg: "Gateway 1 is not accepting connections"
"#;

    #[test]
    fn test_minimal_config() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.gateways.len(), 1);

        let gateway = &config.gateways[0];
        assert_eq!(gateway.port, "10001");
        assert_eq!(gateway.endpoint(), "10.0.0.5:10001");
        assert_eq!(gateway.timeout(), Duration::from_millis(3000));
        assert_eq!(gateway.capacity(), Some(8));

        assert_eq!(config.responses.success, "returnSendSms=success");
        assert_eq!(config.responses.failure, "returnSendSms=failed");
        assert_eq!(config.alerting.history_len, 20);
        assert_eq!(config.alerting.cooldown, Duration::from_secs(3600));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_unparsable_timeout_defaults() {
        let yaml = r#"
gateways:
  - address: gw
    port: "10001"
    password: admin
    socket_timeout: soon
    number_of_sims: "4"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.gateways[0].timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_zero_timeout_defaults() {
        let yaml = r#"
gateways:
  - address: gw
    port: 10001
    password: admin
    socket_timeout: 0
    number_of_sims: 4
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.gateways[0].socket_timeout, "0");
        assert_eq!(config.gateways[0].timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_unparsable_capacity_is_accepted() {
        let yaml = r#"
gateways:
  - address: gw1
    port: 1
    password: a
    number_of_sims: "eight"
  - address: gw2
    port: 2
    password: b
    number_of_sims: 4
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.gateways[0].capacity(), None);
        assert_eq!(config.gateways[1].capacity(), Some(4));
    }

    #[test]
    fn test_alert_and_tuning_sections() {
        let yaml = r#"
gateways:
  - address: gw
    port: 1
    password: a
    number_of_sims: 1
alert:
  smtp_server: smtp.example.com
  smtp_server_port: 587
  email_password: secret
  email_from: alerts@example.com
  email_to: "ops@example.com, oncall@example.com"
alerting:
  history_len: 5
  check_period: 10m
  cooldown: 2h
responses:
  success: OK
  failure: FAIL
telemetry:
  log_level: debug
  json_logs: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.alert.smtp_server_port, "587");
        assert_eq!(config.alerting.history_len, 5);
        assert_eq!(config.alerting.check_period, Duration::from_secs(600));
        assert_eq!(config.alerting.cooldown, Duration::from_secs(7200));
        assert_eq!(config.responses.success, "OK");
        assert!(config.telemetry.json_logs);
    }

    #[test]
    fn test_no_gateways() {
        let result = Config::from_yaml("gateways: []\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least one gateway"));
    }

    #[test]
    fn test_identical_responses_rejected() {
        let yaml = r#"
gateways:
  - address: gw
    port: 1
    password: a
responses:
  success: same
  failure: same
"#;
        let result = Config::from_yaml(yaml);
        assert!(result.unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.gateways[0].address, "10.0.0.5");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/smsdispatch.yaml");
        assert!(result.unwrap_err().to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_example_config() {
        let config = Config::from_yaml(include_str!("../../smsdispatch.example.yaml")).unwrap();

        assert_eq!(config.gateways.len(), 2);
        assert_eq!(config.gateways[1].capacity(), Some(4));
        assert_eq!(config.alert.smtp_server_port, "587");
        assert_eq!(config.alerting.cooldown, Duration::from_secs(3600));
        assert_eq!(config.responses.failure, "returnSendSms=failed");
        assert!(config.telemetry.metrics_file.is_some());
    }
}
