//! Bus event contract: the narrow seam to the external I2C driver.
//!
//! The physical driver (interrupt handling, address matching,
//! electrical retries) lives behind [`BusPort`]; everything above it is
//! plain logic that can run against a mock on the host. The driver owns
//! the bus protocol's response deadline: when [`BusEvent::Request`]
//! arrives, the caller must hand a reply back before returning to
//! [`BusPort::wait_event`].

/// One event delivered by the bus driver for a single port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// Inbound data from the bus master; payload length in bytes
    /// (already copied into the caller's scratch buffer).
    Receive(usize),

    /// Bus master wants to read; exactly one reply must be staged via
    /// [`BusPort::reply`] before waiting for the next event.
    Request,

    /// Transaction-complete marker, informational only.
    Finish,
}

/// Bus-level failure reported by the external driver.
///
/// Never fatal: the affected transaction is abandoned (the driver has
/// already consumed it) and the port task resumes listening.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// Transaction timed out on the wire.
    Timeout,
    /// Lost bus arbitration mid-transaction.
    ArbitrationLost,
    /// Driver-side FIFO overrun.
    Overrun,
    /// Any other driver failure.
    Driver,
}

impl TransportError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "T01",
            Self::ArbitrationLost => "T02",
            Self::Overrun => "T03",
            Self::Driver => "T04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Timeout => "bus timeout",
            Self::ArbitrationLost => "arbitration lost",
            Self::Overrun => "fifo overrun",
            Self::Driver => "driver error",
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// One addressable slave interface on the shared serial bus.
///
/// Implemented by the espidf HAL for real hardware and by scripted
/// mocks in tests.
pub trait BusPort {
    /// Block until the next bus event.
    ///
    /// Receive payloads are copied into `rx`; longer inbound transfers
    /// are reported at their delivered length (the relay layer applies
    /// the truncation policy, not the driver). This is the port task's
    /// only suspension point.
    fn wait_event(&mut self, rx: &mut [u8]) -> Result<BusEvent, TransportError>;

    /// Stage the reply for an in-flight request.
    ///
    /// Must be called exactly once after [`BusEvent::Request`], before
    /// the next `wait_event`.
    fn reply(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let all = [
            TransportError::Timeout,
            TransportError::ArbitrationLost,
            TransportError::Overrun,
            TransportError::Driver,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let text = format!("{}", TransportError::Timeout);
        assert_eq!(text, "T01: bus timeout");
    }
}
