//! Scripted in-memory [`MetricsApi`] for exercising the pipeline.
//!
//! Counts, failure scripts and latency are fixed up front; every call is
//! counted so tests can assert on what the pipeline actually issued.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::client::{MetricDetail, MetricName, MetricsApi};
use crate::error::{LeashError, Result};

type LatencyFn = Box<dyn Fn(&MetricName, u32) -> Duration + Send + Sync>;

#[derive(Default)]
pub struct ScriptedApi {
    names: Vec<MetricName>,
    counts: HashMap<MetricName, u64>,
    /// Attempts that fail before the first success; `u32::MAX` never succeeds.
    failures: HashMap<MetricName, u32>,
    fail_enumeration: bool,
    require_login: bool,
    session_expired: bool,
    logged_in: AtomicBool,
    latency: Option<LatencyFn>,
    attempts: Mutex<HashMap<MetricName, u32>>,
    windows: Mutex<BTreeSet<u32>>,
    enumerate_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub fn with_counts(counts: &[(&str, u64)]) -> Self {
        ScriptedApi {
            names: counts.iter().map(|(n, _)| MetricName::from(*n)).collect(),
            counts: counts
                .iter()
                .map(|(n, c)| (MetricName::from(*n), *c))
                .collect(),
            ..Default::default()
        }
    }

    /// Fail the first `attempts` fetches of `name` with a transient error.
    pub fn failing_first(mut self, name: &str, attempts: u32) -> Self {
        self.failures.insert(MetricName::from(name), attempts);
        self
    }

    pub fn failing_always(self, name: &str) -> Self {
        self.failing_first(name, u32::MAX)
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    /// Reject every call until `ensure_authenticated` has run.
    pub fn requiring_login(mut self) -> Self {
        self.require_login = true;
        self
    }

    /// Enumerate normally, then reject every fetch as unauthenticated.
    pub fn expiring_session(mut self) -> Self {
        self.session_expired = true;
        self
    }

    /// Delay each fetch by `latency(name, attempt)`.
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&MetricName, u32) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Box::new(latency));
        self
    }

    pub fn enumerate_calls(&self) -> usize {
        self.enumerate_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn attempts_for(&self, name: &str) -> u32 {
        self.attempts
            .lock()
            .get(&MetricName::from(name))
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Distinct windows passed to any call.
    pub fn windows_seen(&self) -> Vec<u32> {
        self.windows.lock().iter().copied().collect()
    }

    fn check_login(&self) -> Result<()> {
        if self.require_login && !self.logged_in.load(Ordering::SeqCst) {
            return Err(LeashError::NotAuthenticated);
        }
        Ok(())
    }
}

/// Decrements the in-flight gauge even if the fetch future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetricsApi for ScriptedApi {
    async fn ensure_authenticated(&self) -> Result<()> {
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn enumerate_names(&self, window: u32) -> Result<Vec<MetricName>> {
        self.enumerate_calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().insert(window);
        self.check_login()?;
        if self.fail_enumeration {
            return Err(LeashError::Status {
                url: "scripted:///metric/list".to_string(),
                status: 500,
            });
        }
        Ok(self.names.clone())
    }

    async fn fetch_detail(&self, name: &MetricName, window: u32) -> Result<MetricDetail> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().insert(window);
        self.check_login()?;
        if self.session_expired {
            return Err(LeashError::NotAuthenticated);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let attempt = {
            let mut attempts = self.attempts.lock();
            let n = attempts.entry(name.clone()).or_insert(0);
            *n += 1;
            *n
        };

        if let Some(latency) = &self.latency {
            let delay = latency(name, attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let failures = self.failures.get(name).copied().unwrap_or(0);
        if attempt <= failures {
            return Err(LeashError::Status {
                url: format!("scripted:///metric/hosts_and_tags?metric={}", name),
                status: 503,
            });
        }

        let num_contexts = self.counts.get(name).copied().ok_or_else(|| LeashError::Status {
            url: format!("scripted:///metric/hosts_and_tags?metric={}", name),
            status: 404,
        })?;
        Ok(MetricDetail {
            name: name.clone(),
            num_contexts,
        })
    }
}
