//! Observability
//!
//! - Structured logging via `tracing`, configured by [`init_tracing`]
//! - Span helpers for the pipeline and the web client
//! - Gauge emission via DogStatsD (feature `datadog`), or a no-op client
//!
//! ```rust,ignore
//! use ddleash::observability::{init_tracing, DatadogConfig, Metrics, MetricsRecorder};
//!
//! init_tracing(false).expect("Failed to initialize tracing");
//! let metrics = Metrics::new(&DatadogConfig::default());
//! metrics.record_contexts("acme", 1234);
//! ```

pub mod config;
pub mod recorder;
pub mod spans;
pub mod tracing_setup;

#[cfg(feature = "datadog")]
pub mod metrics;

#[cfg(not(feature = "datadog"))]
#[path = "metrics_noop.rs"]
pub mod metrics;

pub use config::DatadogConfig;
pub use metrics::Metrics;
pub use recorder::{MetricType, MetricsRecorder, RecordedMetric, SimulatedMetrics};
pub use tracing_setup::init as init_tracing;
