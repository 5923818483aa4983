//! DogStatsD Metrics Client
//!
//! Non-blocking UDP client. If the client cannot be built, every call
//! becomes a no-op and a warning is logged once.

use dogstatsd::{Client, Options};
use std::sync::Arc;

use super::config::DatadogConfig;
use super::recorder::MetricsRecorder;

#[derive(Clone)]
pub struct Metrics {
    client: Arc<Option<Client>>,
    prefix: String,
    global_tags: Vec<String>,
}

impl Metrics {
    pub fn new(config: &DatadogConfig) -> Self {
        let client = match Client::new(Options {
            to_addr: config.url.clone(),
            ..Default::default()
        }) {
            Ok(c) => {
                tracing::info!("DogStatsD client targeting {}", config.url);
                Some(c)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to create DogStatsD client: {}. Metrics disabled.",
                    e
                );
                None
            }
        };

        Metrics {
            client: Arc::new(client),
            prefix: config.prefix.clone(),
            global_tags: config.formatted_tags(),
        }
    }

    #[inline]
    pub fn incr(&self, name: &str, tags: &[&str]) {
        if let Some(ref client) = *self.client {
            let metric_name = self.metric_name(name);
            if let Err(e) = client.incr(&metric_name, self.merge_tags(tags)) {
                tracing::warn!(metric = %metric_name, error = %e, "failed to send counter");
            }
        }
    }

    #[inline]
    pub fn gauge(&self, name: &str, value: f64, tags: &[&str]) {
        if let Some(ref client) = *self.client {
            let metric_name = self.metric_name(name);
            if let Err(e) = client.gauge(&metric_name, value.to_string(), self.merge_tags(tags)) {
                tracing::warn!(metric = %metric_name, error = %e, "failed to send gauge");
            }
        }
    }

    fn metric_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    fn merge_tags(&self, tags: &[&str]) -> Vec<String> {
        self.global_tags
            .iter()
            .cloned()
            .chain(tags.iter().map(|s| s.to_string()))
            .collect()
    }
}

impl MetricsRecorder for Metrics {
    #[inline]
    fn incr(&self, name: &str, tags: &[&str]) {
        Metrics::incr(self, name, tags)
    }

    #[inline]
    fn gauge(&self, name: &str, value: f64, tags: &[&str]) {
        Metrics::gauge(self, name, value, tags)
    }
}
