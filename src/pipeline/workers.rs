//! FetchWorkerPool: a fixed number of symmetric fetch loops.
//!
//! Every worker pulls a name, fetches its detail with bounded retries and
//! forwards the result to the aggregator. A worker whose retries are
//! exhausted reports the failure and stops; its siblings stop once they
//! observe cancellation.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, Instrument};

use super::retry::{self, RetryError};
use super::PipelineConfig;
use crate::client::{MetricDetail, MetricName, MetricsApi};
use crate::error::LeashError;
use crate::observability::spans;

pub struct FetchWorkerPool<A: ?Sized> {
    api: Arc<A>,
    workers: usize,
    max_attempts: u32,
    window: u32,
}

/// Channel ends shared by every worker of one run.
struct WorkerLinks {
    names: flume::Receiver<MetricName>,
    details: flume::Sender<MetricDetail>,
    errors: mpsc::Sender<LeashError>,
    cancel: CancellationToken,
}

impl<A: MetricsApi + ?Sized> FetchWorkerPool<A> {
    pub fn new(api: Arc<A>, config: &PipelineConfig) -> Self {
        FetchWorkerPool {
            api,
            workers: config.workers.max(1),
            max_attempts: config.max_attempts.max(1),
            window: config.window,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn the workers. The pool's copies of `details` and `errors` are
    /// dropped here, so those channels close once the last worker exits.
    pub fn spawn(
        self,
        tracker: &TaskTracker,
        cancel: &CancellationToken,
        names: flume::Receiver<MetricName>,
        details: flume::Sender<MetricDetail>,
        errors: mpsc::Sender<LeashError>,
    ) {
        for id in 0..self.workers {
            let links = WorkerLinks {
                names: names.clone(),
                details: details.clone(),
                errors: errors.clone(),
                cancel: cancel.clone(),
            };
            tracker.spawn(run_worker(
                id,
                Arc::clone(&self.api),
                links,
                self.max_attempts,
                self.window,
            ));
        }
    }
}

async fn run_worker<A: MetricsApi + ?Sized>(
    id: usize,
    api: Arc<A>,
    links: WorkerLinks,
    max_attempts: u32,
    window: u32,
) {
    let WorkerLinks {
        names,
        details,
        errors,
        cancel,
    } = links;
    let mut processed = 0usize;

    loop {
        let name = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = names.recv_async() => match next {
                Ok(name) => name,
                // source exhausted
                Err(_) => break,
            },
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            fetched = fetch_with_retry(&*api, &name, max_attempts, window) => fetched,
        };

        match fetched {
            Ok(detail) => {
                if cancel.is_cancelled() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = details.send_async(detail) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
                processed += 1;
                debug!(worker = id, metric = %name, "processed metric");
            }
            Err(RetryError { attempts, last }) => {
                // Auth failures surface as themselves.
                let err = if last.is_auth() {
                    last
                } else {
                    LeashError::Fetch {
                        name: name.to_string(),
                        attempts,
                        source: Box::new(last),
                    }
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = errors.send(err) => {}
                }
                break;
            }
        }
    }

    debug!(worker = id, processed, "worker exiting");
}

async fn fetch_with_retry<A: MetricsApi + ?Sized>(
    api: &A,
    name: &MetricName,
    max_attempts: u32,
    window: u32,
) -> Result<MetricDetail, RetryError> {
    retry::attempt(max_attempts, move |n| {
        api.fetch_detail(name, window)
            .instrument(spans::fetch_span(name.as_str(), n))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;

    #[tokio::test]
    async fn test_pool_forwards_every_detail() {
        let api = Arc::new(ScriptedApi::with_counts(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]));
        let config = PipelineConfig::default().with_workers(3);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let (names_tx, names_rx) = flume::bounded(0);
        let (details_tx, details_rx) = flume::bounded(0);
        let (errors_tx, _errors_rx) = mpsc::channel(3);

        let pool = FetchWorkerPool::new(Arc::clone(&api), &config);
        assert_eq!(pool.workers(), 3);
        pool.spawn(&tracker, &cancel, names_rx, details_tx, errors_tx);

        tokio::spawn(async move {
            for name in ["a", "b", "c", "d"] {
                names_tx.send_async(MetricName::from(name)).await.unwrap();
            }
        });

        let mut total = 0;
        while let Ok(detail) = details_rx.recv_async().await {
            total += detail.num_contexts;
        }
        assert_eq!(total, 10);
        assert_eq!(api.fetch_calls(), 4);
    }

    #[tokio::test]
    async fn test_failing_worker_reports_and_stops() {
        let api = Arc::new(ScriptedApi::with_counts(&[("bad", 1)]).failing_always("bad"));
        let config = PipelineConfig::default().with_workers(1).with_max_attempts(3);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let (names_tx, names_rx) = flume::bounded(1);
        let (details_tx, _details_rx) = flume::bounded(0);
        let (errors_tx, mut errors_rx) = mpsc::channel(1);

        FetchWorkerPool::new(Arc::clone(&api), &config).spawn(
            &tracker,
            &cancel,
            names_rx,
            details_tx,
            errors_tx,
        );
        names_tx.send_async(MetricName::from("bad")).await.unwrap();

        match errors_rx.recv().await {
            Some(LeashError::Fetch { name, attempts, .. }) => {
                assert_eq!(name, "bad");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected: {:?}", other),
        }

        tracker.close();
        tracker.wait().await;
        assert_eq!(api.fetch_calls(), 3);
        drop(names_tx);
    }

    #[tokio::test]
    async fn test_expired_session_reported_untouched() {
        let api = Arc::new(ScriptedApi::with_counts(&[("a", 1)]).expiring_session());
        let config = PipelineConfig::default().with_workers(1);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        let (names_tx, names_rx) = flume::bounded(1);
        let (details_tx, _details_rx) = flume::bounded(0);
        let (errors_tx, mut errors_rx) = mpsc::channel(1);

        FetchWorkerPool::new(Arc::clone(&api), &config).spawn(
            &tracker,
            &cancel,
            names_rx,
            details_tx,
            errors_tx,
        );
        names_tx.send_async(MetricName::from("a")).await.unwrap();

        let err = errors_rx.recv().await.unwrap();
        assert!(matches!(err, LeashError::NotAuthenticated), "got {:?}", err);
        assert_eq!(api.fetch_calls(), 1);

        tracker.close();
        tracker.wait().await;
    }
}
