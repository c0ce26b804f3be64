//! Module: message
//!
//! Purpose: Message type for the relay queues. Represents one opaque
//! fixed-size payload captured from a bus receive event.
//!
//! Architecture:
//! - Compact copy struct, suitable for static ring storage
//! - Oversized input is truncated, never rejected
//! - `valid` is authoritative: slot bytes may be stale after a dequeue
//!   until the next wraparound write recycles them
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

use crate::config::{MAX_PAYLOAD, REPLY_WIDTH};

/// One relayed message.
///
/// Occupies exactly one queue slot from the receive event that created
/// it until the request event that consumes it.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    /// Payload bytes; only `data[..len]` is meaningful.
    pub data: [u8; MAX_PAYLOAD],

    /// Live payload length, `<= MAX_PAYLOAD`.
    pub len: u8,

    /// Monotonic capture time in milliseconds (wrapping).
    pub timestamp_ms: u32,

    /// Whether the slot holds live, undequeued data.
    ///
    /// Never trust `data` without this flag; dequeued slots keep their
    /// bytes until recycled.
    pub valid: bool,
}

impl Message {
    /// Empty invalid message, used to initialize ring slots.
    pub const EMPTY: Self = Self {
        data: [0; MAX_PAYLOAD],
        len: 0,
        timestamp_ms: 0,
        valid: false,
    };

    /// Capture a message from raw bus bytes.
    ///
    /// Input longer than [`MAX_PAYLOAD`] is silently truncated. The
    /// transaction that delivered it already completed, so rejection
    /// has nobody to report to.
    pub fn capture(bytes: &[u8], now_ms: u32) -> Self {
        let len = bytes.len().min(MAX_PAYLOAD);
        let mut data = [0u8; MAX_PAYLOAD];
        data[..len].copy_from_slice(&bytes[..len]);

        Self {
            data,
            len: len as u8,
            timestamp_ms: now_ms,
            valid: true,
        }
    }

    /// Live payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Write the payload into `out`, zero-padding to [`REPLY_WIDTH`].
    ///
    /// An all-zero payload produces the same bytes as the "no message"
    /// reply; the wire format cannot tell them apart.
    pub fn write_padded(&self, out: &mut [u8; REPLY_WIDTH]) {
        let len = (self.len as usize).min(REPLY_WIDTH);
        out[..len].copy_from_slice(&self.data[..len]);
        out[len..].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_invalid() {
        let msg = Message::EMPTY;
        assert!(!msg.valid);
        assert_eq!(msg.len, 0);
        assert!(msg.payload().is_empty());
    }

    #[test]
    fn test_capture_stores_payload_and_stamp() {
        let msg = Message::capture(&[0x11, 0x22, 0x33], 1234);
        assert!(msg.valid);
        assert_eq!(msg.payload(), &[0x11, 0x22, 0x33]);
        assert_eq!(msg.timestamp_ms, 1234);
    }

    #[test]
    fn test_capture_truncates_oversized() {
        let long = [0xAA; MAX_PAYLOAD + 3];
        let msg = Message::capture(&long, 0);
        assert_eq!(msg.len as usize, MAX_PAYLOAD);
        assert_eq!(msg.payload(), &long[..MAX_PAYLOAD]);
    }

    #[test]
    fn test_capture_empty_is_legal() {
        let msg = Message::capture(&[], 7);
        assert!(msg.valid);
        assert_eq!(msg.len, 0);
    }

    #[test]
    fn test_write_padded_zero_fills() {
        let msg = Message::capture(&[0xDE, 0xAD], 0);
        let mut out = [0xFFu8; REPLY_WIDTH];
        msg.write_padded(&mut out);
        assert_eq!(out[..2], [0xDE, 0xAD]);
        assert!(out[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_full_payload_has_no_padding() {
        let full = [1, 2, 3, 4, 5];
        let msg = Message::capture(&full, 0);
        let mut out = [0u8; REPLY_WIDTH];
        msg.write_padded(&mut out);
        assert_eq!(out, full);
    }
}
