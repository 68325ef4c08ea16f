//! Metrics for the transactional notification pipeline.

use metrics::{counter, histogram};

/// Notification pipeline metrics recorder
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record the final outcome of one send (`delivered`, `degraded`, `skipped`, `failed`).
    pub fn record_sent(notification_type: &'static str, outcome: &'static str) {
        counter!(
            "notifications_sent_total",
            "type" => notification_type,
            "outcome" => outcome
        )
        .increment(1);
    }

    /// Record an artifact that could not be generated and was left out.
    pub fn record_artifact_failure(kind: &'static str) {
        counter!("notification_artifact_failures_total", "kind" => kind).increment(1);

        tracing::debug!(kind = kind, "Artifact failure recorded");
    }

    /// Record a send that fell back to the attachment-free retry.
    pub fn record_plain_retry(notification_type: &'static str) {
        counter!("notification_plain_retries_total", "type" => notification_type).increment(1);
    }

    /// Record how long a send took, retries included.
    pub fn record_duration(notification_type: &'static str, duration_secs: f64) {
        histogram!("notification_send_duration_seconds", "type" => notification_type)
            .record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_noop() {
        NotificationMetrics::record_sent("trip-reminder", "failed");
        NotificationMetrics::record_plain_retry("booking-confirmation");
        NotificationMetrics::record_duration("booking-confirmation", 0.25);
    }
}
