//! NameSource: hands the enumerated metric names to whichever worker asks
//! first.

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::client::{MetricName, MetricsApi};
use crate::error::{LeashError, Result};

pub struct NameSource {
    names: Vec<MetricName>,
}

impl NameSource {
    pub fn new(names: Vec<MetricName>) -> Self {
        NameSource { names }
    }

    /// Fetch the complete name list up front.
    ///
    /// Auth failures pass through untouched; anything else is reported as
    /// [`LeashError::Enumeration`].
    pub async fn enumerate<A: MetricsApi + ?Sized>(api: &A, window: u32) -> Result<Self> {
        let names = api.enumerate_names(window).await.map_err(|err| {
            if err.is_auth() {
                err
            } else {
                LeashError::Enumeration(Box::new(err))
            }
        })?;
        info!(count = names.len(), window, "enumerated metric names");
        Ok(NameSource::new(names))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Start delivering names over a rendezvous channel.
    ///
    /// The channel closes once every name has been taken, or as soon as
    /// `cancel` fires, whichever comes first.
    pub fn spawn(self, tracker: &TaskTracker, cancel: CancellationToken) -> flume::Receiver<MetricName> {
        let (tx, rx) = flume::bounded(0);

        tracker.spawn(async move {
            let total = self.names.len();
            for (delivered, name) in self.names.into_iter().enumerate() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(delivered, total, "name delivery cancelled");
                        return;
                    }
                    sent = tx.send_async(name) => {
                        if sent.is_err() {
                            // every worker is gone
                            return;
                        }
                    }
                }
            }
            debug!(total, "all names delivered");
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn names(list: &[&str]) -> Vec<MetricName> {
        list.iter().map(|n| MetricName::from(*n)).collect()
    }

    #[tokio::test]
    async fn test_delivers_each_name_once_then_closes() {
        let tracker = TaskTracker::new();
        let rx = NameSource::new(names(&["a", "b", "c"])).spawn(&tracker, CancellationToken::new());

        let mut got = Vec::new();
        while let Ok(name) = rx.recv_async().await {
            got.push(name.to_string());
        }
        got.sort();
        assert_eq!(got, vec!["a", "b", "c"]);

        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test]
    async fn test_cancel_releases_blocked_delivery() {
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let rx = NameSource::new(names(&["a", "b"])).spawn(&tracker, cancel.clone());

        // Nobody receives; the producer is parked on the hand-off.
        cancel.cancel();
        tracker.close();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .expect("producer did not observe cancellation");
        drop(rx);
    }

    #[tokio::test]
    async fn test_empty_source_closes_immediately() {
        let tracker = TaskTracker::new();
        let source = NameSource::new(Vec::new());
        assert!(source.is_empty());
        let rx = source.spawn(&tracker, CancellationToken::new());
        assert!(rx.recv_async().await.is_err());
    }
}
