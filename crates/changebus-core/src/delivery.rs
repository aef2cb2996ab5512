//! Deliveries produced by a subscription.

use crate::Result;
use crate::events::ChangeMessage;
use chrono::{DateTime, Utc};

/// One unit of payload retrieved from a message source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Concrete subject the payload arrived on.
    pub subject: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Decode the payload as a change message.
    pub fn change_message(&self) -> Result<ChangeMessage> {
        ChangeMessage::from_slice(&self.payload)
    }

    /// Payload as text, with invalid UTF-8 replaced.
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
