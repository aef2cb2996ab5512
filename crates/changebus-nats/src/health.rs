//! Health check for the NATS change bus.

use crate::metrics::NatsMetrics;
use std::sync::Arc;

/// Health status of the NATS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Healthy and connected.
    Healthy,
    /// Degraded but functional.
    Degraded { reason: String },
    /// Unhealthy and not connected.
    Unhealthy { reason: String },
}

impl HealthStatus {
    /// Check if the status is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Check if the service is operational (healthy or degraded).
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded { .. })
    }
}

/// Health check result with details.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub connected: bool,
    pub messages_published: u64,
    pub messages_received: u64,
    pub publish_failures: u64,
    pub ack_failures: u64,
}

impl HealthCheck {
    /// Create a health check from metrics.
    pub fn from_metrics(metrics: &Arc<NatsMetrics>, connected: bool) -> Self {
        let snapshot = metrics.snapshot();

        let status = if !connected {
            HealthStatus::Unhealthy {
                reason: "Not connected to NATS".to_string(),
            }
        } else if snapshot.publish_failures > 0 || snapshot.ack_failures > 0 {
            HealthStatus::Degraded {
                reason: format!(
                    "{} publish failures, {} ack failures recorded",
                    snapshot.publish_failures, snapshot.ack_failures
                ),
            }
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            connected,
            messages_published: snapshot.messages_published,
            messages_received: snapshot.messages_received,
            publish_failures: snapshot.publish_failures,
            ack_failures: snapshot.ack_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy() {
        let metrics = NatsMetrics::new();
        let health = HealthCheck::from_metrics(&metrics, true);
        assert!(health.status.is_healthy());
    }

    #[test]
    fn test_degraded_after_failures() {
        let metrics = NatsMetrics::new();
        metrics.record_publish_failure();

        let health = HealthCheck::from_metrics(&metrics, true);
        assert!(!health.status.is_healthy());
        assert!(health.status.is_operational());
        assert_eq!(health.publish_failures, 1);
    }

    #[test]
    fn test_unhealthy_when_disconnected() {
        let metrics = NatsMetrics::new();
        let health = HealthCheck::from_metrics(&metrics, false);
        assert!(!health.status.is_operational());
    }
}
