//! # RustI2cBridge
//!
//! Dual-port I2C slave message bridge with lock-free relay queues.
//!
//! ## Architecture
//!
//! Two independently addressed slave ports relay opaque fixed-size
//! messages to each other through one [`RelayState`]:
//! - Each port's task writes the *peer's* queue (receive events) and
//!   reads its *own* (request events): single writer, single reader
//!   per queue, enforced by the split handles
//! - Request replies are produced synchronously, inside the bus
//!   protocol's response window
//! - Overflow and bus errors are counted, never fatal; loss under
//!   sustained overflow is a documented best-effort contract
//!
//! A 1-byte sentinel ([`config::CONFIG_SENTINEL`]) triggers a
//! version/capability handshake instead of a data transfer.

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod config;
pub mod hal;
pub mod log_globals;
pub mod logging;
pub mod message;
pub mod queue;
pub mod relay;
pub mod stats;
pub mod task;
pub mod uart_logger;

pub use bus::{BusEvent, BusPort, TransportError};
pub use message::Message;
pub use queue::MessageQueue;
pub use relay::{PortEndpoint, PortId, ReceiveOutcome, RelayState, Reply};
pub use stats::{PortStats, StatsReader};
pub use task::PortTask;
