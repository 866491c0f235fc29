//! Prometheus metrics for the Store runtime.
//!
//! The Store records counters and histograms through the `metrics` facade at
//! all times. Nothing is exported until a recorder is installed; binaries that
//! want the numbers call [`MetricsRecorder::install`] once at startup and
//! render the Prometheus text format whenever they like.
//!
//! # Example
//!
//! ```rust,no_run
//! use catalog_sync_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = MetricsRecorder::install()?;
//! // ... run the client ...
//! if let Some(text) = recorder.render() {
//!     tracing::info!(metrics = %text, "final metrics");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
///
/// `handle` is `None` when another recorder was already installed in this
/// process; metrics are still recorded by that recorder.
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Describe the store metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the bucket configuration is rejected
    /// and [`MetricsError::Install`] if the recorder cannot be installed for a
    /// reason other than one already being present.
    pub fn install() -> Result<Self, MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_01, 0.000_1, 0.001, 0.01, 0.1, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => Ok(Self {
                handle: Some(handle),
            }),
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(Self { handle: None })
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "store_actions_total",
        "Total number of actions folded into the store"
    );
    describe_counter!(
        "store_actions_rejected_total",
        "Actions rejected because the store was shutting down"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time taken to fold one action"
    );
    describe_counter!(
        "store_effects_executed_total",
        "Total number of effects started, labelled by kind"
    );
    describe_gauge!(
        "store_subscribers",
        "Number of snapshot subscribers currently registered"
    );
    describe_counter!(
        "store_subscriber_notifications_total",
        "Total number of subscriber callbacks invoked"
    );
    describe_gauge!(
        "store_pending_requests",
        "Requests waiting for their settling action"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record an action folded by the reducer.
    pub fn record_action(duration: Duration) {
        counter!("store_actions_total").increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an action rejected during shutdown.
    pub fn record_rejected() {
        counter!("store_actions_rejected_total").increment(1);
    }

    /// Record an effect being started.
    pub fn record_effect(kind: &'static str) {
        counter!("store_effects_executed_total", "type" => kind).increment(1);
    }

    /// Record the current subscriber count.
    #[allow(clippy::cast_precision_loss)] // subscriber counts stay far below 2^52
    pub fn record_subscribers(count: usize) {
        gauge!("store_subscribers").set(count as f64);
    }

    /// Record the number of requests waiting to settle.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_waiters(count: usize) {
        gauge!("store_pending_requests").set(count as f64);
    }

    /// Record subscriber callbacks invoked for one snapshot.
    pub fn record_notifications(count: usize) {
        counter!("store_subscriber_notifications_total").increment(count as u64);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_install_is_repeatable() {
        let first = MetricsRecorder::install();
        assert!(first.is_ok());

        // A second install must not fail, it just reuses the global recorder
        let second = MetricsRecorder::install();
        assert!(second.is_ok());
    }

    #[test]
    fn test_store_metrics_render() {
        let recorder = MetricsRecorder::install().unwrap();

        StoreMetrics::record_action(Duration::from_micros(40));
        StoreMetrics::record_effect("future");
        StoreMetrics::record_notifications(2);

        // Another test may own the global recorder; then there is nothing to render here
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("store_actions_total"));
            assert!(rendered.contains("store_effects_executed_total"));
        }
    }
}
