//! No-op metrics client, used when the `datadog` feature is disabled.

use super::config::DatadogConfig;
use super::recorder::MetricsRecorder;

#[derive(Clone, Copy, Default)]
pub struct Metrics;

impl Metrics {
    #[inline(always)]
    pub fn new(_config: &DatadogConfig) -> Self {
        tracing::warn!("built without the datadog feature; metrics are not sent");
        Metrics
    }
}

impl MetricsRecorder for Metrics {
    #[inline(always)]
    fn incr(&self, _name: &str, _tags: &[&str]) {}

    #[inline(always)]
    fn gauge(&self, _name: &str, _value: f64, _tags: &[&str]) {}
}
