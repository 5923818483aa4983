//! PipelineCoordinator: wires source, workers and aggregator together and
//! races the first worker error against the final sum.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, Instrument};

use super::aggregator::ResultAggregator;
use super::names::NameSource;
use super::workers::FetchWorkerPool;
use super::PipelineConfig;
use crate::client::MetricsApi;
use crate::error::{LeashError, Result};
use crate::observability::spans;

/// Lifecycle of one run. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Runs the pipeline. Runs take `&mut self`, so a coordinator drives one
/// run at a time and [`PipelineCoordinator::state`] always reflects it.
pub struct PipelineCoordinator<A: ?Sized> {
    api: Arc<A>,
    config: PipelineConfig,
    state: RunState,
}

impl<A: MetricsApi + ?Sized> PipelineCoordinator<A> {
    pub fn new(api: Arc<A>, config: PipelineConfig) -> Self {
        PipelineCoordinator {
            api,
            config,
            state: RunState::Idle,
        }
    }

    /// State reached by the most recent run.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Compute the total context count across every metric.
    pub async fn run(&mut self) -> Result<u64> {
        let tracker = TaskTracker::new();
        let outcome = self.run_tracked(&tracker).await;
        tracker.close();
        outcome
    }

    /// Like [`PipelineCoordinator::run`], spawning every task on `tracker`
    /// so the caller can confirm they have all terminated.
    ///
    /// Returns as soon as the outcome is known; abandoned tasks wind down
    /// on their own after observing cancellation.
    pub async fn run_tracked(&mut self, tracker: &TaskTracker) -> Result<u64> {
        let span = spans::pipeline_span(self.config.workers, self.config.window);
        async {
            self.transition(RunState::Running);

            let outcome = self.execute(tracker).await;
            match &outcome {
                Ok(sum) => {
                    self.transition(RunState::Succeeded);
                    info!(sum, "aggregation succeeded");
                }
                Err(err) => {
                    self.transition(RunState::Failed);
                    error!(error = %err, "aggregation failed");
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, tracker: &TaskTracker) -> Result<u64> {
        let source = NameSource::enumerate(&*self.api, self.config.window).await?;

        let cancel = CancellationToken::new();
        // Raised on every exit path, including this future being dropped.
        let _cancel_on_exit = cancel.clone().drop_guard();

        let pool = FetchWorkerPool::new(Arc::clone(&self.api), &self.config);
        let (errors_tx, mut errors_rx) = mpsc::channel::<LeashError>(pool.workers());
        let (details_tx, details_rx) = flume::bounded(0);

        let names = source.spawn(tracker, cancel.clone());
        let total = ResultAggregator::new().spawn(tracker, cancel.clone(), details_rx);
        pool.spawn(tracker, &cancel, names, details_tx, errors_tx);

        let outcome = tokio::select! {
            biased;
            Some(err) = errors_rx.recv() => Err(err),
            sum = total => sum.map_err(|_| LeashError::Aborted),
        };

        if outcome.is_err() {
            debug!("cancelling outstanding work");
            cancel.cancel();
        }
        outcome
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;

    #[tokio::test]
    async fn test_state_transitions_on_success() {
        let api = Arc::new(ScriptedApi::with_counts(&[("a", 3), ("b", 5), ("c", 2)]));
        let mut coordinator = PipelineCoordinator::new(api, PipelineConfig::default().with_workers(2));
        assert_eq!(coordinator.state(), RunState::Idle);

        assert_eq!(coordinator.run().await.unwrap(), 10);
        assert_eq!(coordinator.state(), RunState::Succeeded);
    }

    #[tokio::test]
    async fn test_state_transitions_on_failure() {
        let api = Arc::new(ScriptedApi::with_counts(&[("a", 3), ("b", 5)]).failing_always("b"));
        let mut coordinator = PipelineCoordinator::new(api, PipelineConfig::default().with_workers(2));

        let err = coordinator.run().await.unwrap_err();
        assert!(matches!(err, LeashError::Fetch { .. }));
        assert_eq!(coordinator.state(), RunState::Failed);
    }

    #[tokio::test]
    async fn test_empty_enumeration_sums_to_zero() {
        let api = Arc::new(ScriptedApi::with_counts(&[]));
        let mut coordinator = PipelineCoordinator::new(api, PipelineConfig::default());
        assert_eq!(coordinator.run().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_run_fails_untouched() {
        let api = Arc::new(ScriptedApi::with_counts(&[("a", 1)]).requiring_login());
        let mut coordinator = PipelineCoordinator::new(Arc::clone(&api), PipelineConfig::default());

        let err = coordinator.run().await.unwrap_err();
        assert!(matches!(err, LeashError::NotAuthenticated));
        assert_eq!(api.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_runs_against_trait_object() {
        let api: Arc<dyn MetricsApi> = Arc::new(ScriptedApi::with_counts(&[("x", 7)]));
        let mut coordinator = PipelineCoordinator::new(api, PipelineConfig::default());
        assert_eq!(coordinator.run().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_state_tracks_latest_run() {
        let api = Arc::new(ScriptedApi::with_counts(&[("a", 1)]).failing_first("a", 5));
        let mut coordinator = PipelineCoordinator::new(api, PipelineConfig::default());

        assert!(coordinator.run().await.is_err());
        assert_eq!(coordinator.state(), RunState::Failed);

        // attempts 1..=5 were consumed by the first run
        assert_eq!(coordinator.run().await.unwrap(), 1);
        assert_eq!(coordinator.state(), RunState::Succeeded);
    }
}
