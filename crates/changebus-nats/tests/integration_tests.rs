//! Integration tests for changebus-nats.
//!
//! These tests require a running NATS server with JetStream enabled.
//! Run with: `cargo test -p changebus-nats --features integration`
//!
//! To start NATS: `docker run -p 4222:4222 nats:latest -js`

#![cfg(feature = "integration")]

use changebus_core::ports::{ChangePublisher, ChangeSubscriber};
use changebus_core::{BoundedReceiver, ChangeMessage, ChangeType, PrefixedId, ReceiveError};
use changebus_nats::{NatsChangeBus, NatsConfig};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const NATS_URL: &str = "nats://localhost:4222";

fn unique_config() -> NatsConfig {
    let suffix = PrefixedId::generate("itestxx").expect("id");
    let token = suffix.as_str().replace('-', "");
    NatsConfig::new(NATS_URL)
        .with_prefix(format!("test.{}", token))
        .with_stream_name(format!("CHANGEBUS_{}", token.to_uppercase()))
}

fn change() -> ChangeMessage {
    ChangeMessage::new(
        PrefixedId::generate("loadbal").expect("id"),
        ChangeType::Create,
        "integration",
    )
}

#[tokio::test]
async fn test_publish_then_receive() {
    let bus = NatsChangeBus::connect_with_config(unique_config())
        .await
        .expect("connect");

    let mut stream = bus
        .subscribe_changes("*.load-balancer")
        .await
        .expect("subscribe");

    let msg = change();
    bus.publish_change("load-balancer", &msg)
        .await
        .expect("publish");

    let delivery = BoundedReceiver::new(Duration::from_secs(5))
        .receive(&mut stream)
        .await
        .expect("delivery before timeout")
        .expect("delivery ok");

    assert!(delivery.subject.ends_with(".changes.create.load-balancer"));
    assert_eq!(delivery.change_message().expect("decode"), msg);

    let snapshot = bus.metrics().snapshot();
    assert_eq!(snapshot.messages_published, 1);
    assert_eq!(snapshot.messages_received, 1);
}

#[tokio::test]
async fn test_non_matching_topic_times_out() {
    let bus = NatsChangeBus::connect_with_config(unique_config())
        .await
        .expect("connect");

    let mut stream = bus.subscribe_changes("*.pool").await.expect("subscribe");

    bus.publish_change("load-balancer", &change())
        .await
        .expect("publish");

    let err = BoundedReceiver::new(Duration::from_millis(500))
        .receive(&mut stream)
        .await
        .unwrap_err();
    assert_eq!(err, ReceiveError::Timeout);
}

#[tokio::test]
async fn test_new_subscription_skips_earlier_changes() {
    let bus = NatsChangeBus::connect_with_config(unique_config())
        .await
        .expect("connect");
    let receiver = BoundedReceiver::new(Duration::from_secs(5));

    let mut first_stream = bus
        .subscribe_changes("*.load-balancer")
        .await
        .expect("subscribe");
    let first = change();
    assert_ok!(bus.publish_change("load-balancer", &first).await);
    let delivery = receiver
        .receive(&mut first_stream)
        .await
        .expect("first delivery")
        .expect("first delivery ok");
    assert_eq!(delivery.change_message().expect("decode"), first);
    drop(first_stream);

    let mut second_stream = bus
        .subscribe_changes("*.load-balancer")
        .await
        .expect("subscribe");
    let second = change();
    assert_ok!(bus.publish_change("load-balancer", &second).await);
    let delivery = receiver
        .receive(&mut second_stream)
        .await
        .expect("second delivery")
        .expect("second delivery ok");
    assert_eq!(delivery.change_message().expect("decode"), second);
}

#[tokio::test]
async fn test_durable_consumer_replays_retained_changes() {
    let config = unique_config().with_durable_name("replay");
    let bus = NatsChangeBus::connect_with_config(config)
        .await
        .expect("connect");

    let earlier = change();
    assert_ok!(bus.publish_change("load-balancer", &earlier).await);

    let mut stream = bus
        .subscribe_changes("*.load-balancer")
        .await
        .expect("subscribe");
    let delivery = BoundedReceiver::new(Duration::from_secs(5))
        .receive(&mut stream)
        .await
        .expect("replayed delivery")
        .expect("replayed delivery ok");
    assert_eq!(delivery.change_message().expect("decode"), earlier);
}

#[tokio::test]
async fn test_stream_info() {
    let config = unique_config();
    let expected_name = config.stream_name.clone();
    let bus = NatsChangeBus::connect_with_config(config)
        .await
        .expect("connect");

    let info = assert_ok!(bus.stream_info().await);
    assert_eq!(info.name, expected_name);
    assert_eq!(info.subjects.len(), 1);
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let bus = NatsChangeBus::connect_with_config(unique_config())
        .await
        .expect("connect");

    assert!(!bus.is_shutdown());
    assert!(bus.health_check().status.is_healthy());

    bus.shutdown().await.expect("shutdown");

    assert!(bus.is_shutdown());
    assert_err!(bus.publish_change("load-balancer", &change()).await);
}
