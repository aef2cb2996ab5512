//! Bus selection for the CLI.

use changebus_core::Result;
use changebus_core::memory::MemoryChangeBus;
use changebus_core::ports::{ChangePublisher, ChangeSubscriber};
use changebus_nats::{NatsChangeBus, NatsConfig};

/// The change bus a command runs against.
pub enum Bus {
    Nats(NatsChangeBus),
    Memory(MemoryChangeBus),
}

impl Bus {
    /// Connect to NATS, or build an in-process bus when `memory` is set.
    pub async fn connect(config: &NatsConfig, memory: bool) -> Result<Self> {
        if memory {
            return Ok(Bus::Memory(MemoryChangeBus::new(config.prefix.clone())));
        }
        Ok(Bus::Nats(
            NatsChangeBus::connect_with_config(config.clone()).await?,
        ))
    }

    pub fn publisher(&self) -> &dyn ChangePublisher {
        match self {
            Bus::Nats(bus) => bus,
            Bus::Memory(bus) => bus,
        }
    }

    pub fn subscriber(&self) -> &dyn ChangeSubscriber {
        match self {
            Bus::Nats(bus) => bus,
            Bus::Memory(bus) => bus,
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        match self {
            Bus::Nats(bus) => bus.shutdown().await,
            Bus::Memory(bus) => {
                bus.shutdown().await;
                Ok(())
            }
        }
    }
}
