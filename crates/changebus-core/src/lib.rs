//! changebus core
//!
//! Change-message types, subject routing, port traits and the bounded
//! receiver shared by every other changebus crate. This crate has no broker
//! or exporter dependencies; `memory` provides an in-process bus for tests
//! and local runs.

pub mod delivery;
pub mod error;
pub mod events;
pub mod ids;
pub mod memory;
pub mod ports;
pub mod receive;
pub mod subject;

pub use delivery::Delivery;
pub use error::{Error, Result};
pub use events::{ChangeMessage, ChangeType, FieldChange};
pub use ids::PrefixedId;
pub use receive::{BoundedReceiver, ClosedSource, ReceiveError, receive};
