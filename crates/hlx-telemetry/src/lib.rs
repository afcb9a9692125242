//! Prometheus metrics and structured logging for the hlx exchange client.
//!
//! - Structured logging with tracing (JSON in production)
//! - Request and action counters fed through `RequestObserver`

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat};
pub use metrics::{Metrics, PrometheusObserver};
