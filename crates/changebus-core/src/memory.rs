//! In-process change bus.
//!
//! Implements both ports without a broker. Subscriptions are registered as
//! soon as `subscribe_changes` returns, a publish reaches every live
//! subscription whose pattern matches, and each subscription sees messages in
//! publish order. Dropped subscriptions are pruned on the next publish, and
//! after `shutdown` both publishing and subscribing fail.

use crate::delivery::Delivery;
use crate::events::ChangeMessage;
use crate::ports::{ChangePublisher, ChangeSubscriber, DeliveryStream};
use crate::subject::{change_pattern, change_subject, subject_matches};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

struct Subscription {
    pattern: String,
    sender: mpsc::UnboundedSender<Delivery>,
}

/// Change bus backed by in-memory channels.
#[derive(Clone)]
pub struct MemoryChangeBus {
    prefix: String,
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
    shutdown: Arc<AtomicBool>,
}

impl MemoryChangeBus {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            subscriptions: Arc::new(RwLock::new(Vec::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of live subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|s| !s.sender.is_closed())
            .count()
    }

    /// Close every subscription and reject further publishes.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let mut subs = self.subscriptions.write().await;
        for sub in subs.iter() {
            sub.sender.close_channel();
        }
        subs.clear();
    }
}

#[async_trait]
impl ChangePublisher for MemoryChangeBus {
    async fn publish_change(&self, subject_type: &str, message: &ChangeMessage) -> Result<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(Error::EventBus(
                "Cannot publish: shutdown in progress".to_string(),
            ));
        }

        let subject = change_subject(&self.prefix, message.event_type, subject_type)?;
        let payload = message.to_bytes()?;

        let mut subs = self.subscriptions.write().await;
        subs.retain(|s| !s.sender.is_closed());

        let mut delivered = 0;
        for sub in subs.iter().filter(|s| subject_matches(&s.pattern, &subject)) {
            // A failed send means the receiver went away after the prune above.
            if sub
                .sender
                .unbounded_send(Delivery::new(subject.clone(), payload.clone()))
                .is_ok()
            {
                delivered += 1;
            }
        }

        debug!("Published change to {} ({} subscribers)", subject, delivered);
        Ok(())
    }
}

#[async_trait]
impl ChangeSubscriber for MemoryChangeBus {
    async fn subscribe_changes(&self, topic: &str) -> Result<DeliveryStream> {
        let pattern = change_pattern(&self.prefix, topic)?;
        debug!("Subscribing to pattern: {}", pattern);

        let mut subs = self.subscriptions.write().await;
        // `shutdown` sets the flag before taking this lock.
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(Error::EventBus(
                "Cannot subscribe: shutdown in progress".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::unbounded();
        subs.push(Subscription { pattern, sender });

        Ok(Box::pin(receiver.map(Ok::<Delivery, Error>)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeType;
    use crate::ids::PrefixedId;
    use crate::receive::{ReceiveError, receive};
    use std::time::Duration;

    fn message(event_type: ChangeType) -> ChangeMessage {
        ChangeMessage::new(
            PrefixedId::generate("loadbal").unwrap(),
            event_type,
            "api",
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscriber() {
        let bus = MemoryChangeBus::new("com.example");
        let mut lbs = bus.subscribe_changes("*.load-balancer").await.unwrap();
        let mut pools = bus.subscribe_changes("*.pool").await.unwrap();

        let msg = message(ChangeType::Create);
        bus.publish_change("load-balancer", &msg).await.unwrap();

        let delivery = receive(&mut lbs, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.subject, "com.example.changes.create.load-balancer");
        assert_eq!(delivery.change_message().unwrap(), msg);

        let err = receive(&mut pools, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, ReceiveError::Timeout);
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order() {
        let bus = MemoryChangeBus::new("com.example");
        let mut a = bus.subscribe_changes(">").await.unwrap();
        let mut b = bus.subscribe_changes("update.*").await.unwrap();

        bus.publish_change("pool", &message(ChangeType::Create))
            .await
            .unwrap();
        bus.publish_change("pool", &message(ChangeType::Update))
            .await
            .unwrap();

        let first = a.next().await.unwrap().unwrap();
        let second = a.next().await.unwrap().unwrap();
        assert_eq!(first.change_message().unwrap().event_type, ChangeType::Create);
        assert_eq!(second.change_message().unwrap().event_type, ChangeType::Update);

        let only = b.next().await.unwrap().unwrap();
        assert_eq!(only.subject, "com.example.changes.update.pool");
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let bus = MemoryChangeBus::new("com.example");
        let stream = bus.subscribe_changes(">").await.unwrap();
        assert_eq!(bus.subscription_count().await, 1);

        drop(stream);
        bus.publish_change("pool", &message(ChangeType::Delete))
            .await
            .unwrap();
        assert_eq!(bus.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_streams() {
        let bus = MemoryChangeBus::new("com.example");
        let mut stream = bus.subscribe_changes(">").await.unwrap();

        bus.shutdown().await;

        let err = receive(&mut stream, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, ReceiveError::Closed);
        assert!(
            bus.publish_change("pool", &message(ChangeType::Create))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_subscribe_after_shutdown_fails() {
        let bus = MemoryChangeBus::new("com.example");
        bus.shutdown().await;

        let result = bus.subscribe_changes(">").await;
        assert!(matches!(result, Err(Error::EventBus(_))));
        assert_eq!(bus.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_topic() {
        let bus = MemoryChangeBus::new("com.example");
        assert!(bus.subscribe_changes("bad topic").await.is_err());
    }
}
