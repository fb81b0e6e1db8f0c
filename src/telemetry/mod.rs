mod metrics;
mod tracing;

pub use self::metrics::{counters, Metrics};
pub use self::tracing::{init_tracing, TracingConfig};
