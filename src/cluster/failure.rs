//! Sustained failure detection and alert throttling.
//!
//! Each gateway keeps the timestamps of its most recent connection
//! failures in a fixed ring. An alert is due only when every slot falls
//! inside the check period (a dense streak, not one blip) and the
//! previous alert is older than the cooldown.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default number of failure timestamps kept per gateway.
pub const DEFAULT_HISTORY_LEN: usize = 20;

/// Timestamp that is outside every check period.
pub fn far_past() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Fixed-capacity ring of failure timestamps.
#[derive(Debug, Clone)]
pub struct FailureHistory {
    slots: Box<[DateTime<Utc>]>,
    /// Slot written most recently
    head: usize,
}

impl FailureHistory {
    /// Create a ring of `len` slots, all at the far-past sentinel.
    pub fn new(len: usize) -> Self {
        let len = len.max(1);
        Self {
            slots: vec![far_past(); len].into_boxed_slice(),
            head: len - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn slots(&self) -> &[DateTime<Utc>] {
        &self.slots
    }

    /// Index of the oldest slot; the first one wins on ties.
    pub fn oldest_index(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, at)| **at)
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    /// True when no slot is older than `start`.
    pub fn all_since(&self, start: DateTime<Utc>) -> bool {
        self.slots.iter().all(|at| *at >= start)
    }

    /// Overwrite the oldest slot with `at`.
    pub fn record(&mut self, at: DateTime<Utc>) {
        let oldest = self.oldest_index();
        self.slots[oldest] = at;
        self.head = oldest;
    }
}

/// Failure history plus alert cooldown for one gateway.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    history: FailureHistory,
    check_period: chrono::Duration,
    cooldown: chrono::Duration,
    last_alert_sent: DateTime<Utc>,
    /// An alert was raised and its delivery has not been reported yet
    alert_pending: bool,
}

impl FailureTracker {
    pub fn new(history_len: usize, check_period: Duration, cooldown: Duration) -> Self {
        Self {
            history: FailureHistory::new(history_len),
            check_period: to_chrono(check_period),
            cooldown: to_chrono(cooldown),
            last_alert_sent: far_past(),
            alert_pending: false,
        }
    }

    /// Record a connection failure at `now` and decide whether to alert.
    ///
    /// The failure is recorded whatever the decision. A `true` return marks
    /// an alert as pending; report its delivery with
    /// [`alert_completed`](Self::alert_completed).
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        let period_start = now
            .checked_sub_signed(self.check_period)
            .unwrap_or_else(far_past);
        let sustained = self.history.all_since(period_start);

        let cooled_down = self
            .last_alert_sent
            .checked_add_signed(self.cooldown)
            .map_or(false, |due| now >= due);

        self.history.record(now);

        let should_alert = sustained && cooled_down && !self.alert_pending;
        if should_alert {
            self.alert_pending = true;
        }
        should_alert
    }

    /// Report the outcome of a pending alert. Only a delivered alert
    /// restarts the cooldown.
    pub fn alert_completed(&mut self, delivered: bool, at: DateTime<Utc>) {
        self.alert_pending = false;
        if delivered {
            self.last_alert_sent = at;
        }
    }

    pub fn last_alert_sent(&self) -> DateTime<Utc> {
        self.last_alert_sent
    }

    pub fn is_alert_pending(&self) -> bool {
        self.alert_pending
    }

    pub fn history(&self) -> &FailureHistory {
        &self.history
    }
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(
            DEFAULT_HISTORY_LEN,
            Duration::from_secs(60 * 60),
            Duration::from_secs(60 * 60),
        )
    }
}
