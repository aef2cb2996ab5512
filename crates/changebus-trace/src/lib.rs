//! OpenTelemetry integration for changebus.
//!
//! Provides an explicitly owned telemetry context with OTLP export, W3C
//! trace context propagation through change messages, and messaging span
//! constructors.

pub mod context;
pub mod spans;
pub mod tracer;

pub use context::TraceContext;
pub use spans::{ChangeAttributes, consume_span, kickflip_span, publish_span};
pub use tracer::{OtlpConfig, Telemetry, TracerError, TracingConfig};
