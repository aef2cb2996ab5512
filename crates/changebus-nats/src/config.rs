//! Configuration for the NATS change bus.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the NATS change bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URLs (several for a cluster).
    pub urls: Vec<String>,
    /// Subject prefix, e.g. `com.infratographer`.
    pub prefix: String,
    /// Stream name for JetStream.
    pub stream_name: String,
    /// Client name reported to the server.
    pub client_name: Option<String>,
    /// Connection timeout.
    #[serde(with = "secs")]
    pub connection_timeout: Duration,
    /// Request timeout for JetStream operations.
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    /// Message retention period.
    #[serde(with = "secs")]
    pub max_age: Duration,
    /// Durable consumer name; ephemeral consumers are used when unset.
    pub durable_name: Option<String>,
    /// How long the server waits for an ack before redelivering.
    #[serde(with = "secs")]
    pub ack_wait: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            urls: vec!["nats://127.0.0.1:4222".to_string()],
            prefix: "com.infratographer".to_string(),
            stream_name: "CHANGEBUS_CHANGES".to_string(),
            client_name: None,
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            max_age: Duration::from_secs(86400 * 7), // 7 days
            durable_name: None,
            ack_wait: Duration::from_secs(30),
        }
    }
}

impl NatsConfig {
    /// Create a new config with a single URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            ..Default::default()
        }
    }

    /// Set multiple server URLs for cluster support.
    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    /// Set the subject prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the stream name.
    pub fn with_stream_name(mut self, name: impl Into<String>) -> Self {
        self.stream_name = name.into();
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Use a durable consumer so acknowledged progress survives restarts.
    pub fn with_durable_name(mut self, name: impl Into<String>) -> Self {
        self.durable_name = Some(name.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = NatsConfig::new("nats://nats.internal:4222")
            .with_prefix("com.example")
            .with_stream_name("TEST_STREAM")
            .with_durable_name("lb-watcher")
            .with_client_name("changebus-test");

        assert_eq!(config.urls, vec!["nats://nats.internal:4222".to_string()]);
        assert_eq!(config.prefix, "com.example");
        assert_eq!(config.stream_name, "TEST_STREAM");
        assert_eq!(config.durable_name.as_deref(), Some("lb-watcher"));
        assert_eq!(config.client_name.as_deref(), Some("changebus-test"));
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = "prefix: com.example\nrequest_timeout: 9\n";
        let config: NatsConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.prefix, "com.example");
        assert_eq!(config.request_timeout, Duration::from_secs(9));
        assert_eq!(config.urls, NatsConfig::default().urls);
        assert_eq!(config.ack_wait, Duration::from_secs(30));
    }
}
