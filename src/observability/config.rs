//! DogStatsD client configuration
//!
//! Lives under the `[dogstatsd]` table of the config file; the address can
//! be overridden with `DDLEASH_DOGSTATSD_URL`.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `url` | `127.0.0.1:8125` | DogStatsD address |
//! | `prefix` | `ddleash` | Metric name prefix |
//! | `tags` | `[]` | Global tags (`k:v`) |

use serde::{Deserialize, Serialize};

pub const DEFAULT_STATSD_ADDR: &str = "127.0.0.1:8125";
pub const DEFAULT_METRIC_PREFIX: &str = "ddleash";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatadogConfig {
    /// DogStatsD agent address, `host:port`
    pub url: String,
    /// Prefix prepended to every metric name
    pub prefix: String,
    /// Tags attached to every metric
    pub tags: Vec<String>,
}

impl Default for DatadogConfig {
    fn default() -> Self {
        DatadogConfig {
            url: DEFAULT_STATSD_ADDR.to_string(),
            prefix: DEFAULT_METRIC_PREFIX.to_string(),
            tags: Vec::new(),
        }
    }
}

impl DatadogConfig {
    /// Global tags, trimmed, empty entries dropped
    pub fn formatted_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_tags_drop_blanks() {
        let config = DatadogConfig {
            tags: vec![" env:prod ".to_string(), "".to_string()],
            ..Default::default()
        };
        assert_eq!(config.formatted_tags(), vec!["env:prod"]);
    }
}
