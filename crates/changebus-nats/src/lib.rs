//! NATS JetStream change bus for changebus.

mod bus;
pub mod config;
pub mod health;
pub mod metrics;

pub use bus::{NatsChangeBus, StreamInfo};
pub use config::NatsConfig;
pub use health::{HealthCheck, HealthStatus};
pub use metrics::{MetricsSnapshot, NatsMetrics};
