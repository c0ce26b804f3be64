//! Relay controller: classifies bus events and routes messages between
//! the two ports.
//!
//! # Architecture
//!
//! ```text
//! port A task ──on_receive──▶ [queue B] ──on_request──▶ port B task
//! port B task ──on_receive──▶ [queue A] ──on_request──▶ port A task
//! ```
//!
//! [`RelayState`] is the single explicit bridge state, constructed once
//! at startup (usually a `static`) and never torn down. It splits into
//! two [`PortEndpoint`]s (one per bus port) plus a stats handle; each
//! endpoint owns the write half of the peer's queue and the read half
//! of its own, so the per-queue single-writer/single-reader contract is
//! a property of the types, not of task discipline.
//!
//! Every handler runs to completion in bounded time: no allocation, no
//! blocking, no unbounded loops. [`PortEndpoint::on_request`] in
//! particular must produce its reply before the bus deadline owned by
//! the external driver expires.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{version_reply, CONFIG_SENTINEL, REPLY_WIDTH};
use crate::message::Message;
use crate::queue::{Consumer, MessageQueue, Producer};
use crate::stats::StatsReader;

/// One of the two fixed, symmetric bus ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortId {
    A = 0,
    B = 1,
}

impl PortId {
    /// Array index of this port.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The opposite port. Receives here are routed to the peer's queue.
    #[inline]
    pub const fn peer(self) -> Self {
        match self {
            PortId::A => PortId::B,
            PortId::B => PortId::A,
        }
    }
}

/// Per-port bookkeeping shared between the port task and the stats
/// reader.
pub struct PortFlags {
    /// Armed by a 1-byte sentinel receive; the next request on this
    /// port answers with the version descriptor instead of data.
    /// Only this port's task touches it, hence the Relaxed orderings.
    pub(crate) config_requested: AtomicBool,

    /// Timestamp of the last serviced event, milliseconds (wrapping).
    pub(crate) last_activity_ms: AtomicU32,

    /// Bus-level failures observed on this port since boot.
    pub(crate) error_count: AtomicU32,
}

impl PortFlags {
    pub(crate) const fn new() -> Self {
        Self {
            config_requested: AtomicBool::new(false),
            last_activity_ms: AtomicU32::new(0),
            error_count: AtomicU32::new(0),
        }
    }

    #[inline]
    fn touch(&self, now_ms: u32) {
        self.last_activity_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Timestamp of the last serviced event on this port.
    #[inline]
    pub fn last_activity_ms(&self) -> u32 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Bus-level failures observed on this port since boot.
    #[inline]
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Relaxed)
    }
}

/// State belonging to one port: its outbound queue (filled by receives
/// on the *peer* port, drained by requests on this port) and its flags.
pub(crate) struct PortState {
    pub(crate) queue: MessageQueue,
    pub(crate) flags: PortFlags,
}

impl PortState {
    const fn new() -> Self {
        Self {
            queue: MessageQueue::new(),
            flags: PortFlags::new(),
        }
    }
}

/// The whole bridge: exactly two ports.
///
/// Created once at startup; lives for the process lifetime, with no
/// teardown path. `const fn new()` makes it `static`-friendly so no
/// dynamic allocation happens at all.
pub struct RelayState {
    pub(crate) ports: [PortState; 2],
}

impl RelayState {
    /// Create the bridge state with both queues empty.
    pub const fn new() -> Self {
        Self {
            ports: [PortState::new(), PortState::new()],
        }
    }

    /// Split into the two port endpoints and the stats handle.
    ///
    /// Succeeds exactly once (the underlying queues hand out their
    /// writer/reader halves once); returns `None` on any later call.
    pub fn split(&self) -> Option<(PortEndpoint<'_>, PortEndpoint<'_>, StatsReader<'_>)> {
        let (to_a, from_a) = self.ports[PortId::A.index()].queue.split()?;
        let (to_b, from_b) = self.ports[PortId::B.index()].queue.split()?;

        let a = PortEndpoint {
            port: PortId::A,
            flags: &self.ports[PortId::A.index()].flags,
            rx: from_a,
            tx: to_b,
        };
        let b = PortEndpoint {
            port: PortId::B,
            flags: &self.ports[PortId::B.index()].flags,
            rx: from_b,
            tx: to_a,
        };

        Some((a, b, StatsReader::new(self)))
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

/// What became of a receive event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// 1-byte sentinel: handshake armed, nothing enqueued.
    HandshakeArmed,
    /// Message enqueued toward the peer port.
    Relayed,
    /// Peer queue full: message lost, overflow recorded.
    Dropped,
}

/// Reply produced for one request event.
///
/// Data and empty replies are exactly [`REPLY_WIDTH`] bytes with zero
/// padding; the handshake reply is 3 bytes. An all-zero stored payload
/// is indistinguishable on the wire from the "no message" reply, a
/// documented limitation of the protocol, not corrected here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reply {
    buf: [u8; REPLY_WIDTH],
    len: u8,
}

impl Reply {
    /// Version/capability descriptor for the handshake.
    fn version() -> Self {
        let descriptor = version_reply();
        let mut buf = [0u8; REPLY_WIDTH];
        buf[..descriptor.len()].copy_from_slice(&descriptor);
        Self {
            buf,
            len: descriptor.len() as u8,
        }
    }

    /// Dequeued payload, zero-padded to the fixed reply width.
    fn data(msg: &Message) -> Self {
        let mut buf = [0u8; REPLY_WIDTH];
        msg.write_padded(&mut buf);
        Self {
            buf,
            len: REPLY_WIDTH as u8,
        }
    }

    /// All-zero "no message pending" reply.
    fn empty() -> Self {
        Self {
            buf: [0; REPLY_WIDTH],
            len: REPLY_WIDTH as u8,
        }
    }

    /// Bytes to hand to the bus driver.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

/// Event interface for one port; the port's task owns it exclusively.
///
/// Holds the read half of this port's own queue and the write half of
/// the peer's, so routing direction is fixed at split time.
pub struct PortEndpoint<'a> {
    port: PortId,
    flags: &'a PortFlags,
    rx: Consumer<'a>,
    tx: Producer<'a>,
}

impl<'a> PortEndpoint<'a> {
    /// Which port this endpoint services.
    #[inline]
    pub fn port(&self) -> PortId {
        self.port
    }

    /// Handle inbound data from the bus master.
    ///
    /// A receive of exactly one [`CONFIG_SENTINEL`] byte arms the
    /// handshake and is not enqueued. Anything else (including a
    /// zero-length transfer and a sentinel byte inside a longer
    /// payload) is data: it clears a pending handshake, is truncated
    /// to the maximum payload, and is enqueued toward the peer port.
    /// On a full peer queue the message is lost silently (the
    /// delivering transaction already completed; there is no NACK).
    pub fn on_receive(&mut self, data: &[u8], now_ms: u32) -> ReceiveOutcome {
        self.flags.touch(now_ms);

        if data.len() == 1 && data[0] == CONFIG_SENTINEL {
            self.flags.config_requested.store(true, Ordering::Relaxed);
            return ReceiveOutcome::HandshakeArmed;
        }

        self.flags.config_requested.store(false, Ordering::Relaxed);

        if self.tx.enqueue(data, now_ms) {
            ReceiveOutcome::Relayed
        } else {
            ReceiveOutcome::Dropped
        }
    }

    /// Handle a read request from the bus master.
    ///
    /// Always produces exactly one [`Reply`], a hard contract of the
    /// bus protocol, and must stay fast enough for the driver-owned
    /// response deadline: O(1), no allocation, no blocking.
    pub fn on_request(&mut self, now_ms: u32) -> Reply {
        self.flags.touch(now_ms);

        if self.flags.config_requested.swap(false, Ordering::Relaxed) {
            return Reply::version();
        }

        match self.rx.dequeue() {
            Some(msg) => Reply::data(&msg),
            None => Reply::empty(),
        }
    }

    /// Handle a transaction-complete marker. Activity stamp only.
    pub fn on_finish(&mut self, now_ms: u32) {
        self.flags.touch(now_ms);
    }

    /// Record a bus-level failure reported by the driver.
    ///
    /// The transaction is already gone; the relay keeps running.
    pub fn on_bus_error(&mut self) {
        self.flags.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Non-blocking poll of this port's inbound queue.
    ///
    /// The colocated-application surface: take one pending message
    /// without framing a wire reply.
    pub fn poll_message(&mut self) -> Option<Message> {
        self.rx.dequeue()
    }

    /// Messages currently queued for this port.
    #[inline]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
