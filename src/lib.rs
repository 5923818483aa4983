pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod testing;

pub use client::{Account, MetricDetail, MetricName, MetricsApi, WebClient};
pub use config::LeashConfig;
pub use error::{LeashError, Result};
pub use pipeline::{compute_aggregate, PipelineConfig, PipelineCoordinator, RunState};
