//! changebus CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod bus;
mod commands;
mod config;
mod handlers;

use bus::Bus;
use changebus_trace::Telemetry;
use commands::Commands;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "changebus")]
#[command(author, version, about = "Publish and consume traced change events over NATS", long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use an in-process bus instead of NATS
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        return handlers::show_config(&config);
    }

    let telemetry = Telemetry::init(&config.tracing)?;
    let bus = Bus::connect(&config.nats, cli.memory).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let result = match cli.command {
        Commands::Demo => handlers::demo(&config, &bus, &telemetry, &cancel).await,
        Commands::Publish {
            subject_type,
            event_type,
        } => {
            let subject_type = subject_type.unwrap_or_else(|| config.subject_type.clone());
            handlers::publish(&config, &bus, &telemetry, &subject_type, event_type)
                .await
                .map(|_| ())
        }
        Commands::Consume {
            topic,
            timeout_secs,
        } => {
            let topic = topic.unwrap_or_else(|| config.default_topic());
            let timeout = timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.receive_timeout());
            handlers::consume(&config, &bus, &telemetry, &topic, timeout, &cancel).await
        }
        Commands::Status => handlers::status(&bus).await,
        Commands::Config => Ok(()),
    };

    if let Err(e) = bus.shutdown().await {
        warn!("Bus shutdown failed: {}", e);
    }
    telemetry.shutdown()?;

    result
}
