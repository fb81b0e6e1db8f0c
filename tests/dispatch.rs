//! Dispatcher integration tests against mock gateways.
//!
//! Run with: cargo test --test dispatch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use smsdispatch::alert::{Alert, AlertError, AlertNotifier};
use smsdispatch::cluster::{far_past, MockBehavior, MockGateway, Selector};
use smsdispatch::config::Config;
use smsdispatch::dispatch::Dispatcher;

/// Notifier that records alerts and optionally fails delivery
#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        if self.fail {
            Err(AlertError::Transport("smtp unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Notifier whose first delivery never completes
#[derive(Default)]
struct StallingNotifier {
    calls: AtomicUsize,
}

#[async_trait]
impl AlertNotifier for StallingNotifier {
    fn name(&self) -> &'static str {
        "stalling"
    }

    async fn notify(&self, _alert: &Alert) -> Result<(), AlertError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Selector with a fixed primary and failover
struct Scripted {
    primary: usize,
    failover: usize,
}

impl Selector for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn select(&self, exclude: Option<usize>) -> usize {
        match exclude {
            None => self.primary,
            Some(_) => self.failover,
        }
    }
}

/// Port with nothing listening on it
async fn refused_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn config(ports: &[u16], history_len: usize) -> Config {
    let mut yaml = String::from("gateways:\n");
    for (i, port) in ports.iter().enumerate() {
        yaml.push_str(&format!(
            r#"  - address: 127.0.0.1
    port: {port}
    password: admin
    socket_timeout: "1000"
    number_of_sims: "8"
    email_subject: "gateway {i} down"
    email_msg: "gateway {i} is not accepting connections"
"#
        ));
    }
    yaml.push_str(&format!(
        r#"alerting:
  history_len: {history_len}
  check_period: 60m
  cooldown: 60m
responses:
  success: OK
  failure: FAIL
"#
    ));
    Config::from_yaml(&yaml).unwrap()
}

fn scripted(config: &Config, primary: usize, failover: usize, notifier: Arc<RecordingNotifier>) -> Dispatcher {
    Dispatcher::with_selector(config, Box::new(Scripted { primary, failover }), notifier).unwrap()
}

// ============================================================================
// Selection and failover
// ============================================================================

#[tokio::test]
async fn test_primary_success_skips_failover() {
    let primary = MockGateway::start(MockBehavior::Accept).await.unwrap();
    let secondary = MockGateway::start(MockBehavior::Accept).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = scripted(&config(&[primary.port(), secondary.port()], 20), 0, 1, notifier);

    let response = dispatcher.dispatch("447700900123", "Hello World").await;

    assert_eq!(response, b"OK");
    assert_eq!(primary.message_count(), 1);
    assert_eq!(secondary.connection_count(), 0);
    assert_eq!(primary.last_message().unwrap().msg, "48656c6c6f20576f726c64");
}

#[tokio::test]
async fn test_rejection_fails_over() {
    let primary = MockGateway::start(MockBehavior::RejectSend { code: "err-34".into() })
        .await
        .unwrap();
    let secondary = MockGateway::start(MockBehavior::Accept).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher =
        scripted(&config(&[primary.port(), secondary.port()], 20), 0, 1, notifier.clone());

    let response = dispatcher.dispatch("447700900123", "£5").await;

    assert_eq!(response, b"OK");
    assert_eq!(primary.message_count(), 1);
    assert_eq!(secondary.message_count(), 1);
    assert_eq!(secondary.last_message().unwrap().msg, "0135");

    // Rejections never feed the failure history
    let history = dispatcher.gateways()[0].tracker_snapshot();
    assert!(history.history().slots().iter().all(|t| *t == far_past()));
    assert!(notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_both_fail_returns_last_failure() {
    let primary = MockGateway::start(MockBehavior::RejectLogin { code: "err-201".into() })
        .await
        .unwrap();
    let secondary = MockGateway::start(MockBehavior::RejectSend { code: "err-8".into() })
        .await
        .unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher =
        scripted(&config(&[primary.port(), secondary.port()], 20), 0, 1, notifier.clone());

    let response = dispatcher.dispatch("447700900123", "hi").await;

    assert_eq!(response, b"FAIL");
    assert_eq!(primary.login_count(), 1);
    assert_eq!(primary.message_count(), 0);
    assert_eq!(secondary.message_count(), 1);
    assert!(notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_connection_refused_fails_over_and_records() {
    let down = refused_port().await;
    let secondary = MockGateway::start(MockBehavior::Accept).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = scripted(&config(&[down, secondary.port()], 20), 0, 1, notifier.clone());

    let response = dispatcher.dispatch("447700900123", "hi").await;

    assert_eq!(response, b"OK");
    assert_eq!(secondary.message_count(), 1);

    let tracker = dispatcher.gateways()[0].tracker_snapshot();
    let recorded = tracker
        .history()
        .slots()
        .iter()
        .filter(|t| **t != far_past())
        .count();
    assert_eq!(recorded, 1);
    assert!(notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_single_gateway_retries_same_gateway() {
    let only = MockGateway::start(MockBehavior::RejectSend { code: "err-34".into() })
        .await
        .unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Dispatcher::new(&config(&[only.port()], 20), notifier).unwrap();

    let response = dispatcher.dispatch("447700900123", "hi").await;

    assert_eq!(response, b"FAIL");
    assert_eq!(only.message_count(), 2);
}

// ============================================================================
// Alerting
// ============================================================================

#[tokio::test]
async fn test_sustained_failures_alert_once() {
    let down = refused_port().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Dispatcher::new(&config(&[down], 20), notifier.clone()).unwrap();

    // Two attempts per dispatch fill the 20 slots
    for _ in 0..10 {
        assert_eq!(dispatcher.dispatch("447700900123", "hi").await, b"FAIL");
    }
    assert!(notifier.alerts().is_empty());

    dispatcher.dispatch("447700900123", "hi").await;
    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].gateway, format!("127.0.0.1:{}", down));
    assert_eq!(alerts[0].subject, "gateway 0 down");
    assert_eq!(alerts[0].body, "gateway 0 is not accepting connections");
    assert_eq!(dispatcher.gateways()[0].last_alert_sent(), alerts[0].raised_at);

    // Cooldown holds while failures continue
    for _ in 0..5 {
        dispatcher.dispatch("447700900123", "hi").await;
    }
    assert_eq!(notifier.alerts().len(), 1);
}

#[tokio::test]
async fn test_undelivered_alert_retries_on_next_failure() {
    let down = refused_port().await;
    let notifier = Arc::new(RecordingNotifier::failing());
    let dispatcher = Dispatcher::new(&config(&[down], 2), notifier.clone()).unwrap();

    // Failures 1 and 2 fill the history
    dispatcher.dispatch("447700900123", "hi").await;
    assert!(notifier.alerts().is_empty());

    // Failures 3 and 4 both alert since neither delivery succeeded
    dispatcher.dispatch("447700900123", "hi").await;
    assert_eq!(notifier.alerts().len(), 2);
    assert_eq!(dispatcher.gateways()[0].last_alert_sent(), far_past());
}

#[tokio::test]
async fn test_alerts_tracked_per_gateway() {
    let first = refused_port().await;
    let second = refused_port().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = scripted(&config(&[first, second], 2), 0, 1, notifier.clone());

    for _ in 0..3 {
        assert_eq!(dispatcher.dispatch("447700900123", "hi").await, b"FAIL");
    }

    let mut alerted: Vec<String> = notifier.alerts().into_iter().map(|a| a.subject).collect();
    alerted.sort();
    assert_eq!(alerted, vec!["gateway 0 down", "gateway 1 down"]);
}

#[tokio::test]
async fn test_cancelled_dispatch_releases_pending_alert() {
    let down = refused_port().await;
    let notifier = Arc::new(StallingNotifier::default());
    let dispatcher = Dispatcher::new(&config(&[down], 1), notifier.clone()).unwrap();

    // Second failure alerts and the notifier stalls until the caller gives up
    let cancelled =
        tokio::time::timeout(Duration::from_millis(300), dispatcher.dispatch("447700900123", "hi"))
            .await;
    assert!(cancelled.is_err());
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);

    let tracker = dispatcher.gateways()[0].tracker_snapshot();
    assert!(!tracker.is_alert_pending());
    assert_eq!(tracker.last_alert_sent(), far_past());

    // The gateway is still down, so the next failure alerts again
    for _ in 0..5 {
        assert_eq!(dispatcher.dispatch("447700900123", "hi").await, b"FAIL");
    }
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 2);
    assert_ne!(dispatcher.gateways()[0].last_alert_sent(), far_past());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches() {
    let mock = MockGateway::start(MockBehavior::Notify).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Arc::new(Dispatcher::new(&config(&[mock.port()], 20), notifier).unwrap());

    let mut handles = Vec::new();
    for i in 0..16 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            dispatcher
                .dispatch(&format!("4477009001{:02}", i), "hello")
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), b"OK");
    }
    assert_eq!(mock.message_count(), 16);
    assert_eq!(mock.connection_count(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_alert_once() {
    let down = refused_port().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Arc::new(Dispatcher::new(&config(&[down], 20), notifier.clone()).unwrap());

    let mut handles = Vec::new();
    for _ in 0..32 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            dispatcher.dispatch("447700900123", "hi").await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), b"FAIL");
    }

    assert_eq!(notifier.alerts().len(), 1);
}
