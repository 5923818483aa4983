//! Operations behind the CLI subcommands.
//!
//! Each takes its collaborators explicitly so it runs the same against the
//! web client and against test doubles.

use std::sync::Arc;

use crate::client::{MetricName, MetricsApi};
use crate::error::{LeashError, Result};
use crate::observability::MetricsRecorder;
use crate::pipeline::{PipelineConfig, PipelineCoordinator};

pub const METRICS_COUNT: &str = "metrics-count";

/// Values `monitor` knows how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorItem {
    MetricsCount,
}

impl MonitorItem {
    pub fn parse(item: &str) -> Result<Self> {
        match item {
            METRICS_COUNT => Ok(MonitorItem::MetricsCount),
            other => Err(LeashError::UnknownMonitorItem(other.to_string())),
        }
    }
}

/// Log in and compute the context total.
pub async fn count_contexts<A: MetricsApi + ?Sized>(
    api: Arc<A>,
    config: PipelineConfig,
) -> Result<u64> {
    api.ensure_authenticated().await?;
    PipelineCoordinator::new(api, config).run().await
}

/// Compute the context total and report it as a gauge.
pub async fn monitor_metrics_count<A: MetricsApi + ?Sized>(
    api: Arc<A>,
    config: PipelineConfig,
    team: &str,
    recorder: &dyn MetricsRecorder,
) -> Result<u64> {
    match count_contexts(api, config).await {
        Ok(sum) => {
            recorder.record_contexts(team, sum);
            tracing::info!(team, sum, "reported context total");
            Ok(sum)
        }
        Err(err) => {
            recorder.record_run_failure(team);
            Err(err)
        }
    }
}

/// Every metric name, sorted alphabetically.
pub async fn list_metric_names<A: MetricsApi + ?Sized>(
    api: &A,
    window: u32,
) -> Result<Vec<MetricName>> {
    api.ensure_authenticated().await?;
    let mut names = api.enumerate_names(window).await?;
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{MetricType, SimulatedMetrics};
    use crate::testing::ScriptedApi;

    #[test]
    fn test_parse_monitor_item() {
        assert_eq!(MonitorItem::parse("metrics-count").unwrap(), MonitorItem::MetricsCount);
        let err = MonitorItem::parse("hosts").unwrap_err();
        assert_eq!(err.to_string(), "Unknown value to monitor: \"hosts\"");
    }

    #[tokio::test]
    async fn test_monitor_reports_gauge() {
        let api = Arc::new(
            ScriptedApi::with_counts(&[("a", 3), ("b", 5), ("c", 2)]).requiring_login(),
        );
        let metrics = SimulatedMetrics::new();

        let sum = monitor_metrics_count(api, PipelineConfig::default(), "acme", &metrics)
            .await
            .unwrap();
        assert_eq!(sum, 10);

        let recorded = metrics.get_recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].name, "metrics.contexts");
        assert_eq!(recorded[0].value, 10.0);
        assert_eq!(recorded[0].metric_type, MetricType::Gauge);
    }

    #[tokio::test]
    async fn test_monitor_failure_sends_no_gauge() {
        let api = Arc::new(ScriptedApi::with_counts(&[("a", 3), ("b", 5)]).failing_always("b"));
        let metrics = SimulatedMetrics::new();

        let result = monitor_metrics_count(api, PipelineConfig::default(), "acme", &metrics).await;
        assert!(result.is_err());
        assert!(metrics.get_by_name("metrics.contexts").is_empty());
        assert_eq!(metrics.get_by_name("metrics.contexts.errors").len(), 1);
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let api = ScriptedApi::with_counts(&[("zeta", 1), ("alpha", 1), ("mid", 1)]);
        let names = list_metric_names(&api, 3600).await.unwrap();
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
