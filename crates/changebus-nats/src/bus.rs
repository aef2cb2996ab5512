//! NATS JetStream change bus.

use async_nats::jetstream::{
    self,
    consumer::{DeliverPolicy, pull::Config as ConsumerConfig},
    stream::Config as StreamConfig,
};
use async_trait::async_trait;
use changebus_core::ports::{ChangePublisher, ChangeSubscriber, DeliveryStream};
use changebus_core::subject::{all_changes, change_pattern, change_subject};
use changebus_core::{ChangeMessage, Delivery, Error, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use crate::config::NatsConfig;
use crate::health::HealthCheck;
use crate::metrics::{LatencyTimer, NatsMetrics};

/// Change bus backed by NATS JetStream.
#[derive(Clone)]
pub struct NatsChangeBus {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
    metrics: Arc<NatsMetrics>,
    shutdown: Arc<AtomicBool>,
}

impl NatsChangeBus {
    /// Connect to a single NATS server with default settings.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(NatsConfig::new(url)).await
    }

    /// Connect with custom configuration and make sure the change stream exists.
    pub async fn connect_with_config(config: NatsConfig) -> Result<Self> {
        let urls = config.urls.join(",");
        info!("Connecting to NATS at {}", urls);

        let metrics = NatsMetrics::new();

        let mut options = async_nats::ConnectOptions::new()
            .connection_timeout(config.connection_timeout)
            .request_timeout(Some(config.request_timeout))
            .retry_on_initial_connect();
        if let Some(name) = &config.client_name {
            options = options.name(name);
        }

        let client = options
            .connect(urls.as_str())
            .await
            .map_err(|e| Error::EventBus(format!("Failed to connect to NATS: {}", e)))?;

        metrics.set_connected(true);

        let jetstream = jetstream::new(client.clone());

        let stream_config = StreamConfig {
            name: config.stream_name.clone(),
            subjects: vec![all_changes(&config.prefix)?],
            retention: jetstream::stream::RetentionPolicy::Limits,
            max_age: config.max_age,
            storage: jetstream::stream::StorageType::File,
            ..Default::default()
        };

        jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| Error::EventBus(format!("Failed to create stream: {}", e)))?;

        info!(
            "Connected to NATS, stream {} covers {}.changes.>",
            config.stream_name, config.prefix
        );

        Ok(Self {
            client,
            jetstream,
            config,
            metrics,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get the underlying NATS client.
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Get metrics.
    pub fn metrics(&self) -> &Arc<NatsMetrics> {
        &self.metrics
    }

    /// Check connection health.
    pub fn health_check(&self) -> HealthCheck {
        HealthCheck::from_metrics(&self.metrics, self.is_connected())
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == async_nats::connection::State::Connected
    }

    /// Check if shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Graceful shutdown - drain the connection.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown");
        self.shutdown.store(true, Ordering::SeqCst);

        if let Err(e) = self.client.drain().await {
            error!("Error draining NATS connection: {}", e);
        }

        self.metrics.set_connected(false);
        info!("NATS connection drained");

        Ok(())
    }

    /// Get stream info.
    pub async fn stream_info(&self) -> Result<StreamInfo> {
        let mut stream = self
            .jetstream
            .get_stream(&self.config.stream_name)
            .await
            .map_err(|e| Error::EventBus(format!("Failed to get stream: {}", e)))?;

        let info = stream
            .info()
            .await
            .map_err(|e| Error::EventBus(format!("Failed to get stream info: {}", e)))?;

        Ok(StreamInfo {
            name: info.config.name.clone(),
            subjects: info.config.subjects.clone(),
            messages: info.state.messages,
            bytes: info.state.bytes,
            first_seq: info.state.first_sequence,
            last_seq: info.state.last_sequence,
            consumer_count: info.state.consumer_count,
        })
    }

    async fn create_delivery_stream(
        &self,
        consumer: jetstream::consumer::Consumer<ConsumerConfig>,
    ) -> Result<DeliveryStream> {
        let messages = consumer
            .messages()
            .await
            .map_err(|e| Error::EventBus(format!("Failed to get messages: {}", e)))?;

        let metrics = self.metrics.clone();
        let shutdown = self.shutdown.clone();

        let stream = messages.then(move |msg_result| {
            let metrics = metrics.clone();
            let shutdown = shutdown.clone();

            async move {
                if shutdown.load(Ordering::SeqCst) {
                    return Err(Error::EventBus("Shutdown in progress".to_string()));
                }

                let msg = match msg_result {
                    Ok(msg) => msg,
                    Err(e) => return Err(Error::EventBus(format!("Message error: {}", e))),
                };

                metrics.record_receive(msg.payload.len() as u64);

                if let Err(e) = msg.ack().await {
                    metrics.record_ack_failure();
                    warn!("Failed to ack delivery on {}: {}", msg.subject, e);
                }

                Ok(Delivery::new(msg.subject.to_string(), msg.payload.to_vec()))
            }
        });

        Ok(Box::pin(stream))
    }
}

/// Information about a JetStream stream.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub name: String,
    pub subjects: Vec<String>,
    pub messages: u64,
    pub bytes: u64,
    pub first_seq: u64,
    pub last_seq: u64,
    pub consumer_count: usize,
}

#[async_trait]
impl ChangePublisher for NatsChangeBus {
    async fn publish_change(&self, subject_type: &str, message: &ChangeMessage) -> Result<()> {
        if self.is_shutdown() {
            return Err(Error::EventBus(
                "Cannot publish: shutdown in progress".to_string(),
            ));
        }

        let subject = change_subject(&self.config.prefix, message.event_type, subject_type)?;
        let payload = message.to_bytes()?;

        let payload_len = payload.len() as u64;
        debug!("Publishing change to {}", subject);

        let timer = LatencyTimer::start();
        match self
            .jetstream
            .publish(subject.clone(), payload.into())
            .await
        {
            Ok(ack_future) => {
                ack_future.await.map_err(|e| {
                    self.metrics.record_publish_failure();
                    Error::EventBus(format!("Failed to confirm publish: {}", e))
                })?;
                self.metrics.record_publish(payload_len, timer.elapsed_ms());
                Ok(())
            }
            Err(e) => {
                self.metrics.record_publish_failure();
                Err(Error::EventBus(format!(
                    "Failed to publish to {}: {}",
                    subject, e
                )))
            }
        }
    }
}

#[async_trait]
impl ChangeSubscriber for NatsChangeBus {
    async fn subscribe_changes(&self, topic: &str) -> Result<DeliveryStream> {
        let pattern = change_pattern(&self.config.prefix, topic)?;
        debug!("Subscribing to pattern: {}", pattern);

        let consumer = self
            .jetstream
            .create_consumer_on_stream(
                ConsumerConfig {
                    durable_name: self.config.durable_name.clone(),
                    deliver_policy: deliver_policy(&self.config),
                    filter_subject: pattern,
                    ack_wait: self.config.ack_wait,
                    ..Default::default()
                },
                &self.config.stream_name,
            )
            .await
            .map_err(|e| Error::EventBus(format!("Failed to create consumer: {}", e)))?;

        self.create_delivery_stream(consumer).await
    }
}

/// Ephemeral consumers only see changes published after they subscribe.
/// Durable consumers start from the oldest retained change and resume from
/// their ack floor afterwards.
fn deliver_policy(config: &NatsConfig) -> DeliverPolicy {
    if config.durable_name.is_some() {
        DeliverPolicy::All
    } else {
        DeliverPolicy::New
    }
}
