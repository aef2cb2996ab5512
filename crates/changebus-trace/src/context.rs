//! W3C trace context carried on change messages.

use changebus_core::ChangeMessage;
use serde::{Deserialize, Serialize};

pub const TRACEPARENT: &str = "traceparent";
pub const TRACESTATE: &str = "tracestate";

/// Parsed W3C `traceparent`, plus `tracestate` when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub trace_flags: String,
    pub trace_state: Option<String>,
}

impl TraceContext {
    /// Create a sampled trace context.
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            trace_flags: "01".to_string(), // sampled
            trace_state: None,
        }
    }

    /// Parse a `traceparent` header value.
    ///
    /// Only version `00` is accepted. All-zero trace or span IDs are invalid.
    pub fn from_traceparent(header: &str) -> Option<Self> {
        let parts: Vec<&str> = header.trim().split('-').collect();
        if parts.len() != 4 || parts[0] != "00" {
            return None;
        }

        let (trace_id, span_id, flags) = (parts[1], parts[2], parts[3]);
        if !is_lower_hex(trace_id, 32) || !is_lower_hex(span_id, 16) || !is_lower_hex(flags, 2) {
            return None;
        }
        if trace_id.bytes().all(|b| b == b'0') || span_id.bytes().all(|b| b == b'0') {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            trace_flags: flags.to_string(),
            trace_state: None,
        })
    }

    /// Read the trace context a producer attached to a message.
    pub fn from_message(message: &ChangeMessage) -> Option<Self> {
        let mut ctx = Self::from_traceparent(message.trace_context.get(TRACEPARENT)?)?;
        ctx.trace_state = message.trace_context.get(TRACESTATE).cloned();
        Some(ctx)
    }

    /// Convert to W3C traceparent header value.
    pub fn to_traceparent(&self) -> String {
        format!("00-{}-{}-{}", self.trace_id, self.span_id, self.trace_flags)
    }

    /// Set trace state.
    pub fn with_trace_state(mut self, state: impl Into<String>) -> Self {
        self.trace_state = Some(state.into());
        self
    }

    /// Check if this trace is sampled.
    pub fn is_sampled(&self) -> bool {
        u8::from_str_radix(&self.trace_flags, 16)
            .map(|flags| flags & 0x01 == 0x01)
            .unwrap_or(false)
    }
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
