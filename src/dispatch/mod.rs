//! Message dispatch: pick a gateway, send, fail over once, alert on
//! sustained connection failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::alert::{Alert, AlertNotifier};
use crate::cluster::{Gateway, Selector, Weighted};
use crate::config::Config;
use crate::protocol::{SendOutcome, Sentinels};
use crate::telemetry::counters;

/// Errors building a dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no gateways configured")]
    NoGateways,
}

/// Sends messages through the configured gateways.
///
/// Shared by concurrent callers; each gateway's failure history is
/// serialized behind its own lock.
pub struct Dispatcher {
    gateways: Vec<Gateway>,
    selector: Box<dyn Selector>,
    notifier: Arc<dyn AlertNotifier>,
    sentinels: Arc<Sentinels>,
}

impl Dispatcher {
    /// Create a dispatcher with capacity-weighted selection.
    pub fn new(config: &Config, notifier: Arc<dyn AlertNotifier>) -> Result<Self, DispatchError> {
        let selector = Weighted::from_configs(&config.gateways);
        Self::with_selector(config, Box::new(selector), notifier)
    }

    /// Create a dispatcher with a custom selection strategy.
    pub fn with_selector(
        config: &Config,
        selector: Box<dyn Selector>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Result<Self, DispatchError> {
        if config.gateways.is_empty() {
            return Err(DispatchError::NoGateways);
        }

        let sentinels = Arc::new(Sentinels::new(
            config.responses.success.as_bytes(),
            config.responses.failure.as_bytes(),
        ));

        let gateways: Vec<Gateway> = config
            .gateways
            .iter()
            .enumerate()
            .map(|(index, gateway)| {
                Gateway::new(index, gateway, &config.alerting, sentinels.clone())
            })
            .collect();

        info!(
            gateways = gateways.len(),
            selector = selector.name(),
            notifier = notifier.name(),
            "dispatcher created"
        );

        Ok(Self {
            gateways,
            selector,
            notifier,
            sentinels,
        })
    }

    pub fn gateways(&self) -> &[Gateway] {
        &self.gateways
    }

    pub fn selector_name(&self) -> &'static str {
        self.selector.name()
    }

    pub fn sentinels(&self) -> &Sentinels {
        &self.sentinels
    }

    /// Send one message, failing over to a second gateway at most once.
    ///
    /// Always returns a response body: the success sentinel, or the
    /// failure sentinel of the last attempt.
    #[instrument(skip(self, message), fields(telephone = %telephone))]
    pub async fn dispatch(&self, telephone: &str, message: &str) -> Vec<u8> {
        let message = message.trim();

        let first = self.selector.select(None);
        let outcome = self.attempt(first, telephone, message).await;
        if outcome.success {
            counters::dispatch_completed("success");
            return outcome.response;
        }

        let second = self.selector.select(Some(first));
        let from = self.gateway(first).address();
        let to = self.gateway(second).address();
        info!(from = %from, to = %to, "failing over to alternate gateway");
        counters::failover(from, to);

        let outcome = self.attempt(second, telephone, message).await;
        counters::dispatch_completed(if outcome.success { "success" } else { "failed" });
        outcome.response
    }

    /// One attempt against one gateway, recording connection failures.
    async fn attempt(&self, index: usize, telephone: &str, message: &str) -> SendOutcome {
        let gateway = self.gateway(index);
        let outcome = gateway.client().send(telephone, message).await;

        if !outcome.success && outcome.alert_eligible {
            counters::connection_failure(gateway.address());
            let now = Utc::now();
            if gateway.record_connection_failure(now) {
                self.raise_alert(gateway, now).await;
            }
        }

        outcome
    }

    async fn raise_alert(&self, gateway: &Gateway, now: DateTime<Utc>) {
        let alert = Alert {
            gateway: gateway.address().to_string(),
            subject: gateway.alert_subject().to_string(),
            body: gateway.alert_body().to_string(),
            raised_at: now,
        };

        warn!(gateway = %alert.gateway, "sustained connection failures, raising alert");
        counters::alert_raised(&alert.gateway);

        let pending = PendingAlert::new(gateway, now);

        let delivered = match self.notifier.notify(&alert).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    gateway = %alert.gateway,
                    notifier = self.notifier.name(),
                    error = %e,
                    "alert delivery failed"
                );
                false
            }
        };

        counters::alert_delivered(&alert.gateway, delivered);
        pending.complete(delivered);
    }

    // Out-of-range picks from a custom selector go to the first gateway.
    fn gateway(&self, index: usize) -> &Gateway {
        match self.gateways.get(index) {
            Some(gateway) => gateway,
            None => {
                debug!(index, "selector returned unknown gateway, using first");
                &self.gateways[0]
            }
        }
    }
}

/// Clears a gateway's pending alert even if the dispatch is dropped while
/// the notifier is awaited. An abandoned alert counts as undelivered.
struct PendingAlert<'a> {
    gateway: &'a Gateway,
    raised_at: DateTime<Utc>,
    completed: bool,
}

impl<'a> PendingAlert<'a> {
    fn new(gateway: &'a Gateway, raised_at: DateTime<Utc>) -> Self {
        Self {
            gateway,
            raised_at,
            completed: false,
        }
    }

    fn complete(mut self, delivered: bool) {
        self.gateway.complete_alert(delivered, self.raised_at);
        self.completed = true;
    }
}

impl Drop for PendingAlert<'_> {
    fn drop(&mut self) {
        if !self.completed {
            debug!(gateway = %self.gateway.address(), "alert abandoned before delivery");
            self.gateway.complete_alert(false, self.raised_at);
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("gateways", &self.gateways)
            .field("selector", &self.selector.name())
            .field("notifier", &self.notifier.name())
            .finish()
    }
}
