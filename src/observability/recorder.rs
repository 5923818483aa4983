//! Metrics recorder abstraction
//!
//! Gauge emission goes through [`MetricsRecorder`] so the CLI can report to
//! DogStatsD in production and to an in-memory recorder in tests.

use parking_lot::Mutex;

pub trait MetricsRecorder: Send + Sync + 'static {
    /// Increment a counter by 1
    fn incr(&self, name: &str, tags: &[&str]);

    /// Set a gauge value
    fn gauge(&self, name: &str, value: f64, tags: &[&str]);

    /// Report the context total for a team
    fn record_contexts(&self, team: &str, sum: u64) {
        let team_tag = format!("team:{}", team);
        self.gauge("metrics.contexts", sum as f64, &[&team_tag]);
    }

    /// Count a failed aggregation run
    fn record_run_failure(&self, team: &str) {
        let team_tag = format!("team:{}", team);
        self.incr("metrics.contexts.errors", &[&team_tag]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

#[derive(Debug, Clone)]
pub struct RecordedMetric {
    pub name: String,
    pub value: f64,
    pub tags: Vec<String>,
    pub metric_type: MetricType,
}

/// Records every emission for later inspection
#[derive(Default)]
pub struct SimulatedMetrics {
    recorded: Mutex<Vec<RecordedMetric>>,
}

impl SimulatedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_recorded(&self) -> Vec<RecordedMetric> {
        self.recorded.lock().clone()
    }

    pub fn get_by_name(&self, name: &str) -> Vec<RecordedMetric> {
        self.recorded
            .lock()
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    fn push(&self, name: &str, value: f64, tags: &[&str], metric_type: MetricType) {
        self.recorded.lock().push(RecordedMetric {
            name: name.to_string(),
            value,
            tags: tags.iter().map(|s| s.to_string()).collect(),
            metric_type,
        });
    }
}

impl MetricsRecorder for SimulatedMetrics {
    fn incr(&self, name: &str, tags: &[&str]) {
        self.push(name, 1.0, tags, MetricType::Counter);
    }

    fn gauge(&self, name: &str, value: f64, tags: &[&str]) {
        self.push(name, value, tags, MetricType::Gauge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_contexts_emits_tagged_gauge() {
        let metrics = SimulatedMetrics::new();
        metrics.record_contexts("acme", 42);

        let gauges = metrics.get_by_name("metrics.contexts");
        assert_eq!(gauges.len(), 1);
        assert_eq!(gauges[0].value, 42.0);
        assert_eq!(gauges[0].tags, vec!["team:acme"]);
        assert_eq!(gauges[0].metric_type, MetricType::Gauge);
    }

    #[test]
    fn test_record_run_failure_counts() {
        let metrics = SimulatedMetrics::new();
        metrics.record_run_failure("acme");
        metrics.record_run_failure("acme");
        assert_eq!(metrics.get_by_name("metrics.contexts.errors").len(), 2);
    }
}
