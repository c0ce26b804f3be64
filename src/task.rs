//! Per-port event loop.
//!
//! One [`PortTask`] runs per bus endpoint, each on its own core. The
//! loop blocks in [`BusPort::wait_event`], the only suspension point,
//! and everything after an event dispatch runs to completion in
//! bounded, short time: no allocation, no blocking, no unbounded loops.
//! A request must have its reply staged before the loop waits again,
//! inside the response deadline the bus driver owns.
//!
//! Driver errors are counted on the port and the loop keeps listening;
//! nothing here is fatal.

use crate::bus::{BusEvent, BusPort, TransportError};
use crate::logging::LogStream;
use crate::relay::{PortEndpoint, ReceiveOutcome};

/// Inbound scratch size in bytes. Deliberately larger than the maximum
/// payload so oversized transfers reach the relay and get truncated by
/// policy there, instead of being cut off invisibly at the driver.
pub const RX_SCRATCH: usize = 32;

/// What one [`PortTask::poll`] call serviced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Serviced {
    /// A receive event, with its routing outcome.
    Received(ReceiveOutcome),
    /// A request event; the reply was staged (`len` bytes).
    Replied { len: usize },
    /// A transaction-complete marker.
    Finished,
    /// The driver reported a failure while waiting for an event.
    BusError(TransportError),
    /// A reply could not be staged after a request.
    ReplyError(TransportError),
}

/// Event-loop state for one bus port.
pub struct PortTask<'a, B: BusPort> {
    bus: B,
    endpoint: PortEndpoint<'a>,
    log: &'a LogStream,
    scratch: [u8; RX_SCRATCH],
}

impl<'a, B: BusPort> PortTask<'a, B> {
    /// Bind a bus driver to its relay endpoint.
    pub fn new(bus: B, endpoint: PortEndpoint<'a>, log: &'a LogStream) -> Self {
        Self {
            bus,
            endpoint,
            log,
            scratch: [0; RX_SCRATCH],
        }
    }

    /// Wait for and service exactly one bus event.
    ///
    /// For a request event this stages exactly one reply before
    /// returning, per the hard contract of the bus protocol.
    pub fn poll(&mut self, now_ms: u32) -> Serviced {
        match self.bus.wait_event(&mut self.scratch) {
            Ok(BusEvent::Receive(len)) => {
                let len = len.min(RX_SCRATCH);
                let outcome = self.endpoint.on_receive(&self.scratch[..len], now_ms);
                match outcome {
                    ReceiveOutcome::Dropped => {
                        crate::rt_warn!(
                            self.log,
                            now_ms,
                            "port {:?}: peer queue full, {} bytes dropped",
                            self.endpoint.port(),
                            len
                        );
                    }
                    ReceiveOutcome::HandshakeArmed => {
                        crate::rt_debug!(
                            self.log,
                            now_ms,
                            "port {:?}: config requested",
                            self.endpoint.port()
                        );
                    }
                    ReceiveOutcome::Relayed => {
                        crate::rt_debug!(
                            self.log,
                            now_ms,
                            "port {:?}: relayed {} bytes",
                            self.endpoint.port(),
                            len
                        );
                    }
                }
                Serviced::Received(outcome)
            }

            Ok(BusEvent::Request) => {
                let reply = self.endpoint.on_request(now_ms);
                match self.bus.reply(reply.as_bytes()) {
                    Ok(()) => Serviced::Replied {
                        len: reply.as_bytes().len(),
                    },
                    Err(err) => {
                        self.endpoint.on_bus_error();
                        crate::rt_error!(
                            self.log,
                            now_ms,
                            "port {:?}: reply failed: {}",
                            self.endpoint.port(),
                            err
                        );
                        Serviced::ReplyError(err)
                    }
                }
            }

            Ok(BusEvent::Finish) => {
                self.endpoint.on_finish(now_ms);
                Serviced::Finished
            }

            Err(err) => {
                self.endpoint.on_bus_error();
                crate::rt_error!(
                    self.log,
                    now_ms,
                    "port {:?}: bus error: {}",
                    self.endpoint.port(),
                    err
                );
                Serviced::BusError(err)
            }
        }
    }

    /// Run the event loop forever.
    pub fn run(mut self, mut now_ms: impl FnMut() -> u32) -> ! {
        loop {
            let _ = self.poll(now_ms());
        }
    }

    /// The relay endpoint this task services.
    pub fn endpoint(&self) -> &PortEndpoint<'a> {
        &self.endpoint
    }
}
