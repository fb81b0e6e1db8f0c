use anyhow::{Context, Result};
use opentelemetry::metrics::MeterProvider;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// OTEL metrics with a Prometheus exporter, rendered to a text file for
/// the node_exporter textfile collector.
pub struct Metrics {
    registry: Registry,
    meter_provider: SdkMeterProvider,
}

impl Metrics {
    /// Create metrics with an OTEL → Prometheus pipeline and register the
    /// provider globally.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let exporter = exporter()
            .with_registry(registry.clone())
            .build()
            .context("failed to build prometheus exporter")?;

        let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

        opentelemetry::global::set_meter_provider(meter_provider.clone());

        info!("OTEL metrics configured with Prometheus exporter");

        Ok(Self {
            registry,
            meter_provider,
        })
    }

    /// Get meter provider
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    /// Get a meter for recording metrics
    pub fn meter(&self, name: &'static str) -> opentelemetry::metrics::Meter {
        self.meter_provider.meter(name)
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode metrics")?;

        String::from_utf8(buffer).context("metrics are not valid UTF-8")
    }

    /// Write the rendered metrics to `path`, replacing it atomically.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        let staging = path.with_extension("prom.tmp");

        fs::write(&staging, rendered)
            .with_context(|| format!("failed to write metrics file: {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("failed to move metrics file into place: {}", path.display()))?;

        debug!(path = %path.display(), "metrics written");
        Ok(())
    }
}

/// OpenTelemetry instruments for dispatch activity.
///
/// Every recording function is a no-op until [`counters::init`] has been
/// called with a meter.
pub mod counters {
    use opentelemetry::metrics::{Counter, Histogram};
    use opentelemetry::KeyValue;
    use std::sync::OnceLock;

    // ============================================================================
    // DISPATCH METRICS
    // ============================================================================

    static DISPATCH_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static DISPATCH_FAILOVER_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();

    // ============================================================================
    // GATEWAY METRICS
    // ============================================================================

    static GATEWAY_ATTEMPTS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static GATEWAY_EXCHANGE_DURATION: OnceLock<Histogram<f64>> = OnceLock::new();
    static GATEWAY_CONNECTION_FAILURES_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();

    // ============================================================================
    // ALERT METRICS
    // ============================================================================

    static ALERTS_RAISED_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
    static ALERTS_DELIVERED_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();

    /// Register all instruments against `meter`. Later calls are ignored.
    pub fn init(meter: &opentelemetry::metrics::Meter) {
        let _ = DISPATCH_TOTAL.set(
            meter
                .u64_counter("sms_dispatch_total")
                .with_description("Dispatch calls by final result")
                .build(),
        );
        let _ = DISPATCH_FAILOVER_TOTAL.set(
            meter
                .u64_counter("sms_dispatch_failover_total")
                .with_description("Second attempts on an alternate gateway")
                .build(),
        );

        let _ = GATEWAY_ATTEMPTS_TOTAL.set(
            meter
                .u64_counter("sms_gateway_attempts_total")
                .with_description("Send attempts by gateway and result")
                .build(),
        );
        let _ = GATEWAY_EXCHANGE_DURATION.set(
            meter
                .f64_histogram("sms_gateway_exchange_duration_seconds")
                .with_description("Connect, login and submit duration")
                .build(),
        );
        let _ = GATEWAY_CONNECTION_FAILURES_TOTAL.set(
            meter
                .u64_counter("sms_gateway_connection_failures_total")
                .with_description("Connection failures recorded in the failure history")
                .build(),
        );

        let _ = ALERTS_RAISED_TOTAL.set(
            meter
                .u64_counter("sms_alerts_raised_total")
                .with_description("Sustained failure alerts raised per gateway")
                .build(),
        );
        let _ = ALERTS_DELIVERED_TOTAL.set(
            meter
                .u64_counter("sms_alerts_delivered_total")
                .with_description("Alert notifications by gateway and delivery result")
                .build(),
        );
    }

    // ============================================================================
    // Dispatch
    // ============================================================================

    pub fn dispatch_completed(result: &str) {
        if let Some(c) = DISPATCH_TOTAL.get() {
            c.add(1, &[kv("result", result)]);
        }
    }

    pub fn failover(from: &str, to: &str) {
        if let Some(c) = DISPATCH_FAILOVER_TOTAL.get() {
            c.add(1, &[kv("from", from), kv("to", to)]);
        }
    }

    // ============================================================================
    // Gateway
    // ============================================================================

    pub fn gateway_attempt(gateway: &str, result: &str) {
        if let Some(c) = GATEWAY_ATTEMPTS_TOTAL.get() {
            c.add(1, &[kv("gateway", gateway), kv("result", result)]);
        }
    }

    pub fn gateway_exchange_duration(gateway: &str, duration_secs: f64) {
        if let Some(h) = GATEWAY_EXCHANGE_DURATION.get() {
            h.record(duration_secs, &[kv("gateway", gateway)]);
        }
    }

    pub fn connection_failure(gateway: &str) {
        if let Some(c) = GATEWAY_CONNECTION_FAILURES_TOTAL.get() {
            c.add(1, &[kv("gateway", gateway)]);
        }
    }

    // ============================================================================
    // Alerts
    // ============================================================================

    pub fn alert_raised(gateway: &str) {
        if let Some(c) = ALERTS_RAISED_TOTAL.get() {
            c.add(1, &[kv("gateway", gateway)]);
        }
    }

    pub fn alert_delivered(gateway: &str, delivered: bool) {
        if let Some(c) = ALERTS_DELIVERED_TOTAL.get() {
            let result = if delivered { "delivered" } else { "failed" };
            c.add(1, &[kv("gateway", gateway), kv("result", result)]);
        }
    }

    fn kv(key: &'static str, value: &str) -> KeyValue {
        KeyValue::new(key, value.to_string())
    }
}
