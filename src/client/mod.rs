//! Web API collaborator
//!
//! The aggregation pipeline only talks to the outside world through the
//! [`MetricsApi`] trait. [`WebClient`] is the production implementation
//! backed by Datadog's private, cookie-authenticated web endpoints; tests
//! substitute in-memory doubles.

pub mod urls;
pub mod web;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

pub use web::WebClient;

/// Opaque, unique identifier of a metric as returned by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricName(String);

impl MetricName {
    pub fn new(name: impl Into<String>) -> Self {
        MetricName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetricName {
    fn from(name: &str) -> Self {
        MetricName(name.to_string())
    }
}

impl From<String> for MetricName {
    fn from(name: String) -> Self {
        MetricName(name)
    }
}

/// Per-metric payload relevant to aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDetail {
    pub name: MetricName,
    /// Number of distinct host/tag combinations reporting the metric.
    pub num_contexts: u64,
}

/// Credentials for the web login form.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Account {
    pub team: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("team", &self.team)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Remote calls consumed by the aggregation pipeline.
///
/// `window` is the look-back period in seconds; it is passed through to
/// the API untouched. Calls made before [`MetricsApi::ensure_authenticated`]
/// succeeds fail with [`crate::LeashError::NotAuthenticated`].
#[async_trait]
pub trait MetricsApi: Send + Sync + 'static {
    async fn ensure_authenticated(&self) -> Result<()>;

    async fn enumerate_names(&self, window: u32) -> Result<Vec<MetricName>>;

    /// Idempotent; safe to call again for the same name.
    async fn fetch_detail(&self, name: &MetricName, window: u32) -> Result<MetricDetail>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_name_transparent_json() {
        let names: Vec<MetricName> = serde_json::from_str(r#"["a.b", "c"]"#).unwrap();
        assert_eq!(names, vec![MetricName::from("a.b"), MetricName::from("c")]);
        assert_eq!(names[0].to_string(), "a.b");
    }

    #[test]
    fn test_account_debug_redacts_password() {
        let account = Account {
            team: "acme".to_string(),
            user: "ops".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", account);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("acme"));
    }
}
