//! ResultAggregator: sole owner of the running sum.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::client::MetricDetail;

#[derive(Debug, Default)]
pub struct ResultAggregator {
    sum: u64,
    seen: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, detail: &MetricDetail) {
        self.sum = self.sum.saturating_add(detail.num_contexts);
        self.seen += 1;
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Fold details until every sender is gone, then hand the total over
    /// exactly once. Nothing is emitted if `cancel` fires first.
    pub fn spawn(
        mut self,
        tracker: &TaskTracker,
        cancel: CancellationToken,
        details: flume::Receiver<MetricDetail>,
    ) -> oneshot::Receiver<u64> {
        let (tx, rx) = oneshot::channel();

        tracker.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(seen = self.seen, "aggregation abandoned");
                        return;
                    }
                    next = details.recv_async() => match next {
                        Ok(detail) => self.add(&detail),
                        Err(_) => break,
                    },
                }
            }

            debug!(seen = self.seen, sum = self.sum, "aggregation complete");
            let _ = tx.send(self.sum);
        });

        rx
    }
}
