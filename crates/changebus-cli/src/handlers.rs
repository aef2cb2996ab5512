//! Command handlers.

use crate::bus::Bus;
use crate::config::CliConfig;
use changebus_core::ports::DeliveryStream;
use changebus_core::subject::{change_pattern, change_subject};
use changebus_core::{BoundedReceiver, ChangeMessage, ChangeType, Delivery, PrefixedId};
use changebus_trace::{
    ChangeAttributes, Telemetry, TraceContext, consume_span, kickflip_span, publish_span,
};
use console::style;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info};
use tracing_opentelemetry::OpenTelemetrySpanExt;

type HandlerResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Subscribe, publish one change, receive it and kickflip.
pub async fn demo(
    config: &CliConfig,
    bus: &Bus,
    telemetry: &Telemetry,
    cancel: &CancellationToken,
) -> HandlerResult {
    let topic = config.default_topic();
    let mut stream = bus.subscriber().subscribe_changes(&topic).await?;

    publish(config, bus, telemetry, &config.subject_type, ChangeType::Create).await?;

    let delivery = receive_one(config, &mut stream, config.receive_timeout(), cancel).await?;
    process_delivery(config, telemetry, &delivery).await
}

/// Publish a single change.
pub async fn publish(
    config: &CliConfig,
    bus: &Bus,
    telemetry: &Telemetry,
    subject_type: &str,
    event_type: ChangeType,
) -> HandlerResult<ChangeMessage> {
    let mut message = ChangeMessage::new(
        PrefixedId::generate(&config.id_prefix)?,
        event_type,
        config.source.clone(),
    );

    let destination = change_subject(&config.nats.prefix, event_type, subject_type)?;
    let span = publish_span(
        &ChangeAttributes::from_message(&message)
            .subject_type(subject_type)
            .destination(destination.clone()),
    );
    telemetry.inject(&span, &mut message);

    bus.publisher()
        .publish_change(subject_type, &message)
        .instrument(span)
        .await?;

    println!(
        "{} Published {} for {} to {}",
        style("✓").green(),
        style(event_type).bold(),
        message.subject_id,
        style(&destination).dim()
    );
    Ok(message)
}

/// Wait for one change on `topic` and process it.
pub async fn consume(
    config: &CliConfig,
    bus: &Bus,
    telemetry: &Telemetry,
    topic: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> HandlerResult {
    let pattern = change_pattern(&config.nats.prefix, topic)?;
    println!(
        "Waiting up to {}s for a change on {}...",
        timeout.as_secs(),
        style(&pattern).bold()
    );

    let mut stream = bus.subscriber().subscribe_changes(topic).await?;
    let delivery = receive_one(config, &mut stream, timeout, cancel).await?;
    process_delivery(config, telemetry, &delivery).await
}

/// Show health and stream info.
pub async fn status(bus: &Bus) -> HandlerResult {
    let Bus::Nats(nats) = bus else {
        println!("{} In-memory bus has no broker status", style("i").blue());
        return Ok(());
    };

    let health = nats.health_check();
    let marker = if health.status.is_healthy() {
        style("✓").green()
    } else if health.status.is_operational() {
        style("!").yellow()
    } else {
        style("✗").red()
    };
    println!("{} {:?}", marker, health.status);

    let info = nats.stream_info().await?;
    println!("  Stream:    {}", style(&info.name).bold());
    println!("  Subjects:  {}", info.subjects.join(", "));
    println!("  Messages:  {} ({} bytes)", info.messages, info.bytes);
    println!("  Sequence:  {}..{}", info.first_seq, info.last_seq);
    println!("  Consumers: {}", info.consumer_count);
    Ok(())
}

/// Print the effective configuration.
pub fn show_config(config: &CliConfig) -> HandlerResult {
    print!("{}", config.to_yaml()?);
    Ok(())
}

async fn receive_one(
    config: &CliConfig,
    stream: &mut DeliveryStream,
    timeout: Duration,
    cancel: &CancellationToken,
) -> HandlerResult<Delivery> {
    let receiver = BoundedReceiver::new(timeout).on_closed(config.closed_source);
    let delivery = receiver.receive_or_cancel(stream, cancel).await??;
    Ok(delivery)
}

async fn process_delivery(
    config: &CliConfig,
    telemetry: &Telemetry,
    delivery: &Delivery,
) -> HandlerResult {
    let message = delivery.change_message()?;

    if let Some(trace) = TraceContext::from_message(&message) {
        info!(
            trace_id = %trace.trace_id,
            span_id = %trace.span_id,
            sampled = trace.is_sampled(),
            "Received change with trace context"
        );
    }

    let span = consume_span(
        &ChangeAttributes::from_message(&message).destination(delivery.subject.clone()),
    );
    span.set_parent(telemetry.extract(&message));

    let kickflip = config.kickflip_duration();
    async move {
        println!("{}", delivery.payload_lossy());
        do_a_kickflip(kickflip).await;
    }
    .instrument(span)
    .await;

    Ok(())
}

async fn do_a_kickflip(duration: Duration) {
    async {
        println!("Kickflipped!");
        tokio::time::sleep(duration).await;
    }
    .instrument(kickflip_span())
    .await
}
