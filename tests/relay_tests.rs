//! Relay controller and handshake tests

use rust_i2c_bridge::config::{
    CONFIG_SENTINEL, MAX_PAYLOAD, PROTOCOL_VERSION, QUEUE_CAPACITY, REPLY_WIDTH,
};
use rust_i2c_bridge::{PortId, ReceiveOutcome, RelayState};

#[test]
fn test_handshake_request_never_enters_data_queue() {
    let relay = RelayState::new();
    let (mut a, mut b, stats) = relay.split().unwrap();

    assert_eq!(
        a.on_receive(&[CONFIG_SENTINEL], 1),
        ReceiveOutcome::HandshakeArmed
    );
    assert_eq!(stats.peek(PortId::A).depth, 0);
    assert_eq!(stats.peek(PortId::B).depth, 0);

    // Next request on the same port answers the handshake.
    let reply = a.on_request(2);
    assert_eq!(
        reply.as_bytes(),
        &[
            PROTOCOL_VERSION,
            QUEUE_CAPACITY as u8,
            MAX_PAYLOAD as u8
        ]
    );

    // The peer's traffic is unaffected.
    assert_eq!(b.on_request(3).as_bytes(), &[0; REPLY_WIDTH]);
}

#[test]
fn test_receive_on_a_request_on_b_round_trip() {
    let relay = RelayState::new();
    let (mut a, mut b, stats) = relay.split().unwrap();

    let payload = [0xCA, 0xFE, 0x42];
    assert_eq!(a.on_receive(&payload, 10), ReceiveOutcome::Relayed);
    assert_eq!(stats.peek(PortId::B).depth, 1);

    let reply = b.on_request(11);
    assert_eq!(reply.as_bytes().len(), REPLY_WIDTH);
    assert_eq!(&reply.as_bytes()[..3], &payload);
    assert_eq!(&reply.as_bytes()[3..], &[0, 0]);
    assert_eq!(stats.peek(PortId::B).depth, 0);
}

#[test]
fn test_empty_queue_request_is_all_zero_and_touches_nothing_else() {
    let relay = RelayState::new();
    let (mut a, _b, stats) = relay.split().unwrap();

    let before = stats.peek(PortId::A);
    let reply = a.on_request(99);

    assert_eq!(reply.as_bytes(), &[0u8; REPLY_WIDTH]);

    let after = stats.peek(PortId::A);
    assert_eq!(after.last_activity_ms, 99);
    assert_eq!(after.depth, before.depth);
    assert_eq!(after.errors, before.errors);
    assert_eq!(after.overflow_drops, before.overflow_drops);
    assert!(!after.overflow);
}

#[test]
fn test_oversized_payload_truncated_not_rejected() {
    let relay = RelayState::new();
    let (mut a, mut b, _stats) = relay.split().unwrap();

    let long: Vec<u8> = (1..=12u8).collect();
    assert_eq!(a.on_receive(&long, 0), ReceiveOutcome::Relayed);

    let reply = b.on_request(1);
    assert_eq!(reply.as_bytes(), &long[..MAX_PAYLOAD]);
}

#[test]
fn test_one_byte_sentinel_routes_to_handshake_even_though_legal_data_length() {
    let relay = RelayState::new();
    let (mut a, mut b, _stats) = relay.split().unwrap();

    // Any other 1-byte value is plain data...
    assert_eq!(a.on_receive(&[0x01], 0), ReceiveOutcome::Relayed);
    assert_eq!(b.on_request(1).as_bytes()[0], 0x01);

    // ...but the sentinel alone always takes the handshake path.
    assert_eq!(
        a.on_receive(&[CONFIG_SENTINEL], 2),
        ReceiveOutcome::HandshakeArmed
    );
    assert_eq!(b.on_request(3).as_bytes(), &[0; REPLY_WIDTH]);
}

#[test]
fn test_all_zero_payload_indistinguishable_from_empty() {
    // Documented wire-format limitation, preserved on purpose.
    let relay = RelayState::new();
    let (mut a, mut b, _stats) = relay.split().unwrap();

    a.on_receive(&[0, 0, 0], 0);
    let stored = b.on_request(1);
    let empty = b.on_request(2);
    assert_eq!(stored.as_bytes(), empty.as_bytes());
}

#[test]
fn test_handshake_flag_is_per_port() {
    let relay = RelayState::new();
    let (mut a, mut b, _stats) = relay.split().unwrap();

    a.on_receive(&[CONFIG_SENTINEL], 1);

    // Port B sees normal traffic; only port A has the handshake armed.
    assert_eq!(b.on_request(2).as_bytes(), &[0; REPLY_WIDTH]);
    assert_eq!(a.on_request(3).as_bytes().len(), 3);
}

#[test]
fn test_overflow_counted_on_destination_port() {
    let relay = RelayState::new();
    let (mut a, _b, stats) = relay.split().unwrap();

    for _ in 0..QUEUE_CAPACITY {
        assert_eq!(a.on_receive(&[7], 0), ReceiveOutcome::Relayed);
    }
    for _ in 0..3 {
        assert_eq!(a.on_receive(&[7], 0), ReceiveOutcome::Dropped);
    }

    // The drops land on the destination (B) side, not the source.
    assert_eq!(stats.peek(PortId::B).overflow_drops, 3);
    assert_eq!(stats.peek(PortId::A).overflow_drops, 0);

    // Sticky until collected, then clear.
    assert!(stats.collect(PortId::B).overflow);
    assert!(!stats.peek(PortId::B).overflow);
}

#[test]
fn test_zero_length_receive_relays_as_empty_message() {
    let relay = RelayState::new();
    let (mut a, mut b, stats) = relay.split().unwrap();

    assert_eq!(a.on_receive(&[], 0), ReceiveOutcome::Relayed);
    assert_eq!(stats.peek(PortId::B).depth, 1);
    assert_eq!(b.on_request(1).as_bytes(), &[0; REPLY_WIDTH]);
    assert_eq!(stats.peek(PortId::B).depth, 0);
}
