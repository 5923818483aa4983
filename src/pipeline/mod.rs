//! Concurrent fetch-aggregate pipeline
//!
//! ```text
//! NameSource ──names──▶ FetchWorkerPool (W workers) ──details──▶ ResultAggregator
//!                              │                                       │
//!                              └──────────errors──────▶ PipelineCoordinator ◀──sum──┘
//! ```
//!
//! Names and details move over rendezvous channels. One cancellation token
//! is shared by every task; the coordinator raises it the moment a worker
//! reports a fatal error, and again on exit so nothing outlives a run.

pub mod aggregator;
pub mod coordinator;
pub mod names;
pub mod retry;
pub mod workers;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::client::MetricsApi;
use crate::error::Result;

pub use aggregator::ResultAggregator;
pub use coordinator::{PipelineCoordinator, RunState};
pub use names::NameSource;
pub use retry::{attempt, RetryError};
pub use workers::FetchWorkerPool;

pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_WINDOW_SECS: u32 = 3600;

/// Pipeline tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of concurrent fetch workers
    pub workers: usize,
    /// Attempts per metric, first try included
    pub max_attempts: u32,
    /// Look-back window in seconds, passed through to the API
    pub window: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            workers: DEFAULT_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: DEFAULT_WINDOW_SECS,
        }
    }
}

impl PipelineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }
}

/// Sum the context counts of every metric in the account.
///
/// All-or-nothing: either every enumerated metric was fetched and summed,
/// or the first fatal error is returned.
pub async fn compute_aggregate<A: MetricsApi + ?Sized>(
    api: Arc<A>,
    workers: usize,
    window: u32,
) -> Result<u64> {
    let config = PipelineConfig::default()
        .with_workers(workers)
        .with_window(window);
    PipelineCoordinator::new(api, config).run().await
}
