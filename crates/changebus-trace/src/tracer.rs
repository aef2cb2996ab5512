//! Telemetry setup and lifecycle.
//!
//! [`Telemetry`] owns the tracer provider and the W3C propagator. Nothing is
//! installed as a process-wide OpenTelemetry global: code that needs to
//! propagate context is handed the `Telemetry` value, and dropping it (or
//! calling [`Telemetry::shutdown`]) flushes pending spans.

use changebus_core::ChangeMessage;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const TRACER_NAME: &str = "changebus";

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Failed to initialize tracer: {0}")]
    Init(String),
    #[error("Failed to shut down tracer: {0}")]
    Shutdown(String),
}

/// OTLP/gRPC exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtlpConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4317".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub service_name: String,
    pub service_version: String,
    /// Ratio of new root traces to sample; children follow their parent.
    pub sample_rate: f64,
    pub otlp: Option<OtlpConfig>,
    pub resource_attributes: HashMap<String, String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "changebus".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            sample_rate: 0.6,
            otlp: None,
            resource_attributes: HashMap::new(),
        }
    }
}

/// Explicit telemetry context: tracer provider plus propagator.
pub struct Telemetry {
    provider: Option<TracerProvider>,
    propagator: TraceContextPropagator,
}

impl Telemetry {
    /// Build the provider and install the global log subscriber.
    ///
    /// Without an OTLP section (or with tracing disabled) only the fmt
    /// subscriber is installed and spans stay local.
    pub fn init(config: &TracingConfig) -> Result<Self, TracerError> {
        let provider = match (&config.otlp, config.enabled) {
            (Some(otlp), true) => Some(build_provider(config, otlp)?),
            _ => None,
        };

        install_subscriber(provider.as_ref())?;

        Ok(Self {
            provider,
            propagator: TraceContextPropagator::new(),
        })
    }

    /// Telemetry that exports nothing and installs no subscriber.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            propagator: TraceContextPropagator::new(),
        }
    }

    /// Whether spans are exported.
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Write the context of `span` into the message's trace context.
    pub fn inject(&self, span: &tracing::Span, message: &mut ChangeMessage) {
        self.inject_context(&span.context(), message);
    }

    pub fn inject_context(&self, cx: &Context, message: &mut ChangeMessage) {
        self.propagator
            .inject_context(cx, &mut message.trace_context);
    }

    /// Read the producer's context out of a message.
    pub fn extract(&self, message: &ChangeMessage) -> Context {
        self.propagator.extract(&message.trace_context)
    }

    /// Flush pending spans and shut the provider down.
    pub fn shutdown(mut self) -> Result<(), TracerError> {
        match self.provider.take() {
            Some(provider) => provider
                .shutdown()
                .map_err(|e| TracerError::Shutdown(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("Tracer shutdown failed: {}", e);
            }
        }
    }
}

fn build_resource(config: &TracingConfig) -> Resource {
    let mut attrs = vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
    ];

    for (key, value) in &config.resource_attributes {
        attrs.push(KeyValue::new(key.clone(), value.clone()));
    }

    Resource::new(attrs)
}

fn build_sampler(sample_rate: f64) -> Sampler {
    let root = if sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sample_rate)
    };

    Sampler::ParentBased(Box::new(root))
}

fn build_provider(
    config: &TracingConfig,
    otlp_config: &OtlpConfig,
) -> Result<TracerProvider, TracerError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_config.endpoint)
        .with_timeout(Duration::from_secs(otlp_config.timeout_seconds))
        .build()
        .map_err(|e| TracerError::Init(e.to_string()))?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(build_sampler(config.sample_rate))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(build_resource(config))
        .build())
}

fn install_subscriber(provider: Option<&TracerProvider>) -> Result<(), TracerError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    let telemetry_layer =
        provider.map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(TRACER_NAME)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(telemetry_layer)
        .try_init()
        .map_err(|e| TracerError::Init(e.to_string()))
}
