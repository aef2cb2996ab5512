//! Change messages published on the bus.
//!
//! The JSON layout follows the established infratographer change-message
//! format so that messages interoperate with other producers and consumers.

use crate::ids::PrefixedId;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of change described by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeType::Create),
            "update" => Ok(ChangeType::Update),
            "delete" => Ok(ChangeType::Delete),
            other => Err(Error::Serialization(format!("unknown change type: {}", other))),
        }
    }
}

/// A single field modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(default)]
    pub previous_value: String,
    #[serde(default)]
    pub current_value: String,
}

/// A change to a subject, as carried on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeMessage {
    #[serde(rename = "subjectID")]
    pub subject_id: PrefixedId,
    #[serde(rename = "eventType")]
    pub event_type: ChangeType,
    #[serde(rename = "additionalSubjects", default, deserialize_with = "null_as_empty")]
    pub additional_subject_ids: Vec<PrefixedId>,
    #[serde(
        rename = "actorID",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub actor_id: Option<PrefixedId>,
    #[serde(default)]
    pub source: String,
    pub timestamp: DateTime<Utc>,
    /// W3C trace context (`traceparent`, `tracestate`) of the producer.
    #[serde(rename = "traceContext", default, deserialize_with = "null_as_empty")]
    pub trace_context: HashMap<String, String>,
    #[serde(rename = "subjectFields", default, deserialize_with = "null_as_empty")]
    pub subject_fields: HashMap<String, String>,
    #[serde(rename = "changeset", default, deserialize_with = "null_as_empty")]
    pub field_changes: Vec<FieldChange>,
    #[serde(rename = "additionalData", default, deserialize_with = "null_as_empty")]
    pub additional_data: HashMap<String, serde_json::Value>,
}

impl ChangeMessage {
    /// Create a change message stamped with the current time.
    pub fn new(subject_id: PrefixedId, event_type: ChangeType, source: impl Into<String>) -> Self {
        Self {
            subject_id,
            event_type,
            additional_subject_ids: Vec::new(),
            actor_id: None,
            source: source.into(),
            timestamp: Utc::now(),
            trace_context: HashMap::new(),
            subject_fields: HashMap::new(),
            field_changes: Vec::new(),
            additional_data: HashMap::new(),
        }
    }

    pub fn with_actor(mut self, actor_id: PrefixedId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_additional_subject(mut self, id: PrefixedId) -> Self {
        self.additional_subject_ids.push(id);
        self
    }

    pub fn with_subject_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.subject_fields.insert(key.into(), value.into());
        self
    }

    pub fn with_field_change(
        mut self,
        field: impl Into<String>,
        previous: impl Into<String>,
        current: impl Into<String>,
    ) -> Self {
        self.field_changes.push(FieldChange {
            field: field.into(),
            previous_value: previous.into(),
            current_value: current.into(),
        });
        self
    }

    pub fn with_additional_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.additional_data.insert(key.into(), value);
        self
    }

    /// Encode as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Collections may be sent as `null` by producers that leave them unset.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An absent actor may be sent as `null` or `""`.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<PrefixedId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => PrefixedId::parse(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
