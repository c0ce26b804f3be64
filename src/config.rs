//! Module: config
//!
//! Purpose: Wire protocol constants for the I2C bridge.
//! Single source of truth for both ports; nothing here is tunable at
//! runtime because every value is part of the on-bus contract.
//!
//! Safety: Safe. Constants only.

/// 7-bit I2C slave address answered on both ports.
pub const PORT_ADDRESS: u8 = 0x76;

/// Reserved byte requesting relay metadata instead of carrying data.
///
/// A receive of exactly one byte equal to this value arms the
/// configuration handshake; the next request on the same port returns
/// [`version_reply`] instead of queued data.
pub const CONFIG_SENTINEL: u8 = 0xD1;

/// Per-direction queue capacity in messages. Must be a power of 2.
pub const QUEUE_CAPACITY: usize = 16;

/// Maximum data payload length in bytes.
pub const MAX_PAYLOAD: usize = 5;

/// Width of every data/empty reply. Shorter payloads are zero-padded.
pub const REPLY_WIDTH: usize = MAX_PAYLOAD;

/// Handshake protocol version, first byte of the version reply.
pub const PROTOCOL_VERSION: u8 = 2;

/// Canned handshake reply: `{version, queue capacity, max payload}`.
///
/// Lets an external controller probe relay parameters before sending
/// real traffic.
pub const fn version_reply() -> [u8; 3] {
    [PROTOCOL_VERSION, QUEUE_CAPACITY as u8, MAX_PAYLOAD as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_reply_fields() {
        let reply = version_reply();
        assert_eq!(reply[0], PROTOCOL_VERSION);
        assert_eq!(reply[1], QUEUE_CAPACITY as u8);
        assert_eq!(reply[2], MAX_PAYLOAD as u8);
    }

    #[test]
    fn test_capacity_is_power_of_two() {
        assert!(QUEUE_CAPACITY.is_power_of_two());
    }

    #[test]
    fn test_sentinel_is_not_a_padding_byte() {
        // Zero-padded replies must never alias the handshake trigger.
        assert_ne!(CONFIG_SENTINEL, 0x00);
    }
}
