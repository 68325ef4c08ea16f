//! Observability utilities for the storefront notification services.
//!
//! This crate provides:
//! - Prometheus recorder installation and exposition rendering
//! - `NotificationMetrics`, the counters and histograms of the email pipeline
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, NotificationMetrics};
//!
//! let handle = init_metrics()?;
//! NotificationMetrics::record_sent("welcome", "delivered");
//! println!("{}", handle.render());
//! ```

pub mod notifications;

pub use notifications::NotificationMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder.
///
/// Only the first call installs; later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (None until `init_metrics` succeeded)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Render the current Prometheus exposition text.
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        "notifications_sent_total",
        "Notification sends by type and outcome"
    );
    describe_counter!(
        "notification_artifact_failures_total",
        "Artifact generation failures by artifact kind"
    );
    describe_counter!(
        "notification_plain_retries_total",
        "Sends retried without attachments after a delivery failure"
    );
    describe_histogram!(
        "notification_send_duration_seconds",
        "End-to-end notification send duration in seconds"
    );
}
