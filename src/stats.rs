//! Relay statistics for the external stats collector.
//!
//! The third handle returned by [`RelayState::split`]: a read-mostly
//! observer over both ports' counters. Reading a snapshot is the ONLY
//! place the sticky per-queue overflow flag gets cleared; queue
//! traffic never resets it.

use crate::relay::{PortId, RelayState};

/// Point-in-time counters for one port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortStats {
    /// Messages currently queued for this port.
    pub depth: usize,
    /// Sticky overflow flag as of this snapshot (cleared by the read).
    pub overflow: bool,
    /// Total messages dropped to overflow since boot.
    pub overflow_drops: u32,
    /// Bus-level failures observed on this port since boot.
    pub errors: u32,
    /// Timestamp of the last serviced event, milliseconds.
    pub last_activity_ms: u32,
}

/// Observer handle over the relay counters.
pub struct StatsReader<'a> {
    relay: &'a RelayState,
}

impl<'a> StatsReader<'a> {
    pub(crate) fn new(relay: &'a RelayState) -> Self {
        Self { relay }
    }

    /// Snapshot one port's counters, clearing its sticky overflow flag.
    pub fn collect(&self, port: PortId) -> PortStats {
        let state = &self.relay.ports[port.index()];

        PortStats {
            depth: state.queue.len(),
            overflow: state.queue.take_overflow(),
            overflow_drops: state.queue.overflow_drops(),
            errors: state.flags.error_count(),
            last_activity_ms: state.flags.last_activity_ms(),
        }
    }

    /// Snapshot one port's counters without clearing anything.
    pub fn peek(&self, port: PortId) -> PortStats {
        let state = &self.relay.ports[port.index()];

        PortStats {
            depth: state.queue.len(),
            overflow: state.queue.overflow(),
            overflow_drops: state.queue.overflow_drops(),
            errors: state.flags.error_count(),
            last_activity_ms: state.flags.last_activity_ms(),
        }
    }
}
