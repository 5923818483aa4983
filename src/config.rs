//! ddleash configuration.
//!
//! Loaded from a TOML file, then overlaid with `DDLEASH_*` environment
//! variables:
//!
//! ```toml
//! [datadog]
//! team = "acme"
//! user = "ops@acme.io"
//! password = "..."
//!
//! [dogstatsd]
//! url = "127.0.0.1:8125"
//!
//! [pipeline]
//! workers = 20
//! max_attempts = 5
//! window = 3600
//!
//! [http]
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::Account;
use crate::error::{LeashError, Result};
use crate::observability::DatadogConfig;
use crate::pipeline::PipelineConfig;

pub const CONFIG_FILE_NAME: &str = ".ddleash.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeashConfig {
    /// Web login credentials
    #[serde(default)]
    pub datadog: Account,

    /// Where the context gauge is sent
    #[serde(default)]
    pub dogstatsd: DatadogConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LeashConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Resolve the config file, apply environment overrides and validate.
    ///
    /// An explicit `path` must exist. Otherwise `$HOME/.ddleash.toml` and
    /// `./.ddleash.toml` are tried in order; finding neither is fine as
    /// long as the environment supplies the required keys.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match default_locations().into_iter().find(|p| p.is_file()) {
                Some(found) => {
                    tracing::debug!(path = %found.display(), "using config file");
                    Self::load(&found)?
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(team) = lookup("DDLEASH_DATADOG_TEAM") {
            self.datadog.team = team;
        }
        if let Some(user) = lookup("DDLEASH_DATADOG_USER") {
            self.datadog.user = user;
        }
        if let Some(password) = lookup("DDLEASH_DATADOG_PASSWORD") {
            self.datadog.password = password;
        }
        if let Some(url) = lookup("DDLEASH_DOGSTATSD_URL") {
            self.dogstatsd.url = url;
        }
        if let Some(workers) = lookup("DDLEASH_WORKERS") {
            let workers = workers.parse::<usize>().map_err(|_| {
                LeashError::Config(format!("\"DDLEASH_WORKERS\" is not a number: {:?}", workers))
            })?;
            self.pipeline = self.pipeline.clone().with_workers(workers);
        }
        Ok(())
    }

    /// Every mandatory key must be set.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("datadog.team", &self.datadog.team),
            ("datadog.user", &self.datadog.user),
            ("datadog.password", &self.datadog.password),
            ("dogstatsd.url", &self.dogstatsd.url),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(LeashError::Config(format!("{:?} must be set.", key)));
            }
        }

        if self.pipeline.workers == 0 {
            return Err(LeashError::Config("\"pipeline.workers\" must be at least 1.".to_string()));
        }
        Ok(())
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = Vec::with_capacity(2);
    if let Some(home) = std::env::var_os("HOME") {
        locations.push(PathBuf::from(home).join(CONFIG_FILE_NAME));
    }
    locations.push(PathBuf::from(".").join(CONFIG_FILE_NAME));
    locations
}
