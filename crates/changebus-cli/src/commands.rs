//! CLI command definitions.

use changebus_core::ChangeType;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Publish one change, receive it back and emit a kickflip span
    Demo,

    /// Publish a single change
    Publish {
        /// Subject type, e.g. load-balancer
        #[arg(short, long)]
        subject_type: Option<String>,

        /// Change type: create, update or delete
        #[arg(short, long, default_value = "create")]
        event_type: ChangeType,
    },

    /// Wait for a single change and print it
    Consume {
        /// Topic pattern, e.g. "*.load-balancer"
        #[arg(short, long)]
        topic: Option<String>,

        /// Seconds to wait before giving up
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Show bus health and stream info
    Status,

    /// Print the effective configuration
    Config,
}
