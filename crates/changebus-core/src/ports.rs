//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the core domain and bus adapters.

use crate::Result;
use crate::delivery::Delivery;
use crate::events::ChangeMessage;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Stream of deliveries from a subscription.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery>> + Send>>;

/// Publishes change messages.
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    /// Publish a change for the given subject type, e.g. `load-balancer`.
    async fn publish_change(&self, subject_type: &str, message: &ChangeMessage) -> Result<()>;
}

/// Subscribes to change messages.
#[async_trait]
pub trait ChangeSubscriber: Send + Sync {
    /// Subscribe to changes matching a topic.
    /// Topic supports wildcards: `*.load-balancer`, `create.>`
    async fn subscribe_changes(&self, topic: &str) -> Result<DeliveryStream>;
}
