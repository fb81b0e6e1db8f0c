//! A configured gateway and its runtime failure state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{AlertingConfig, GatewayConfig};
use crate::protocol::{GatewayClient, Sentinels};

use super::failure::FailureTracker;

/// A physical SMS gateway.
pub struct Gateway {
    /// Position in the configured gateway list
    index: usize,

    /// Immutable descriptor
    config: GatewayConfig,

    /// Protocol client
    client: GatewayClient,

    /// Connection failure history and alert cooldown
    tracker: Mutex<FailureTracker>,
}

impl Gateway {
    /// Create a gateway with a fresh failure history.
    pub fn new(
        index: usize,
        config: &GatewayConfig,
        alerting: &AlertingConfig,
        sentinels: Arc<Sentinels>,
    ) -> Self {
        Self {
            index,
            config: config.clone(),
            client: GatewayClient::new(config, sentinels),
            tracker: Mutex::new(FailureTracker::new(
                alerting.history_len,
                alerting.check_period,
                alerting.cooldown,
            )),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Gateway address (host:port).
    pub fn address(&self) -> &str {
        self.client.endpoint()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    /// Alert email subject for this gateway.
    pub fn alert_subject(&self) -> &str {
        &self.config.email_subject
    }

    /// Alert email body for this gateway.
    pub fn alert_body(&self) -> &str {
        &self.config.email_msg
    }

    // The tracker holds plain data that is never left half-updated, so a
    // poisoned lock is still usable.
    fn tracker(&self) -> MutexGuard<'_, FailureTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a connection failure. Returns true if an alert is due.
    pub fn record_connection_failure(&self, now: DateTime<Utc>) -> bool {
        let should_alert = self.tracker().record_failure(now);
        debug!(
            gateway = %self.address(),
            should_alert,
            "connection failure recorded"
        );
        should_alert
    }

    /// Report whether the alert raised for this gateway was delivered.
    pub fn complete_alert(&self, delivered: bool, at: DateTime<Utc>) {
        self.tracker().alert_completed(delivered, at);
    }

    /// When the last alert for this gateway was delivered.
    pub fn last_alert_sent(&self) -> DateTime<Utc> {
        self.tracker().last_alert_sent()
    }

    /// Copy of the current failure state.
    pub fn tracker_snapshot(&self) -> FailureTracker {
        self.tracker().clone()
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("index", &self.index)
            .field("address", &self.address())
            .field("capacity", &self.config.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::failure::far_past;
    use std::time::Duration;

    fn gateway(history_len: usize) -> Gateway {
        let config = GatewayConfig {
            address: "127.0.0.1".to_string(),
            port: "10001".to_string(),
            password: "admin".to_string(),
            socket_timeout: "250".to_string(),
            number_of_sims: "8".to_string(),
            email_subject: "gw1 down".to_string(),
            email_msg: "gw1 unreachable".to_string(),
        };
        let alerting = AlertingConfig {
            history_len,
            ..Default::default()
        };
        Gateway::new(0, &config, &alerting, Arc::new(Sentinels::new("OK", "FAIL")))
    }

    #[test]
    fn test_gateway_from_config() {
        let gw = gateway(20);
        assert_eq!(gw.address(), "127.0.0.1:10001");
        assert_eq!(gw.client().timeout(), Duration::from_millis(250));
        assert_eq!(gw.alert_subject(), "gw1 down");
        assert_eq!(gw.last_alert_sent(), far_past());
        assert_eq!(gw.tracker_snapshot().history().len(), 20);
    }

    #[test]
    fn test_alert_cycle() {
        let gw = gateway(2);
        let now = Utc::now();

        assert!(!gw.record_connection_failure(now));
        assert!(!gw.record_connection_failure(now));
        assert!(gw.record_connection_failure(now));

        gw.complete_alert(true, now);
        assert_eq!(gw.last_alert_sent(), now);
        assert!(!gw.record_connection_failure(now));
    }

    #[test]
    fn test_concurrent_failures_all_recorded() {
        let gw = Arc::new(gateway(64));
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gw = gw.clone();
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        gw.record_connection_failure(now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = gw.tracker_snapshot();
        let recorded = snapshot.history().slots().iter().filter(|at| **at == now).count();
        assert_eq!(recorded, 64);
    }
}
