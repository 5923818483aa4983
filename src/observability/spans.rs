//! Span helpers for pipeline tracing

use tracing::{span, Level, Span};

/// Span covering one aggregation run
#[inline]
pub fn pipeline_span(workers: usize, window: u32) -> Span {
    span!(
        Level::INFO,
        "ddleash.pipeline",
        pipeline.workers = workers,
        pipeline.window = window
    )
}

/// Span for a single detail fetch attempt
#[inline]
pub fn fetch_span(metric: &str, attempt: u32) -> Span {
    span!(
        Level::DEBUG,
        "ddleash.fetch",
        metric = %metric,
        attempt = attempt
    )
}

/// Span for a web API login
#[inline]
pub fn login_span(team: &str) -> Span {
    span!(Level::INFO, "ddleash.login", team = %team)
}
