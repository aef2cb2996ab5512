//! Span creation for change publishing and consumption.

use changebus_core::ChangeMessage;
use tracing::{Level, Span, span};

/// Messaging span attributes following OpenTelemetry semantic conventions.
#[derive(Debug, Default)]
pub struct ChangeAttributes {
    pub subject_id: Option<String>,
    pub subject_type: Option<String>,
    pub event_type: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
}

impl ChangeAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes describing a change message.
    pub fn from_message(message: &ChangeMessage) -> Self {
        Self {
            subject_id: Some(message.subject_id.to_string()),
            event_type: Some(message.event_type.to_string()),
            source: Some(message.source.clone()),
            ..Self::default()
        }
    }

    pub fn subject_type(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = Some(subject_type.into());
        self
    }

    /// NATS subject or pattern the message travels on.
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Create a producer span for publishing a change.
pub fn publish_span(attrs: &ChangeAttributes) -> Span {
    span!(
        Level::INFO,
        "publish",
        otel.kind = "producer",
        messaging.system = "nats",
        messaging.operation = "publish",
        messaging.destination.name = attrs.destination.as_deref().unwrap_or(""),
        change.subject_id = attrs.subject_id.as_deref().unwrap_or(""),
        change.subject_type = attrs.subject_type.as_deref().unwrap_or(""),
        change.event_type = attrs.event_type.as_deref().unwrap_or(""),
        change.source = attrs.source.as_deref().unwrap_or(""),
    )
}

/// Create a consumer span for a received change.
pub fn consume_span(attrs: &ChangeAttributes) -> Span {
    span!(
        Level::INFO,
        "consume",
        otel.kind = "consumer",
        messaging.system = "nats",
        messaging.operation = "receive",
        messaging.destination.name = attrs.destination.as_deref().unwrap_or(""),
        change.subject_id = attrs.subject_id.as_deref().unwrap_or(""),
        change.event_type = attrs.event_type.as_deref().unwrap_or(""),
        change.source = attrs.source.as_deref().unwrap_or(""),
    )
}

/// Create the decorative span that follows a consume.
pub fn kickflip_span() -> Span {
    span!(Level::INFO, "kickflip")
}
