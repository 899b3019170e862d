#![no_main]

//! Fuzz target for handshake reassembly.
//!
//! The input is a sequence of handshake fragments with their headers.
//! Whatever arrives, delivered messages come out in message_seq order
//! with the length their header announced.

use libfuzzer_sys::fuzz_target;

use dtlskx::message::HandshakeFragment;
use dtlskx::InboundFlight;

fuzz_target!(|data: &[u8]| {
    let mut inbound = InboundFlight::new(8);
    let mut expected_seq = 0u16;
    let mut input = data;

    while let Ok((rest, fragment)) = HandshakeFragment::parse(input) {
        let _ = inbound.contribute(&fragment.header, fragment.body);
        while let Some(message) = inbound.next_message() {
            assert_eq!(message.message_seq, expected_seq);
            expected_seq = expected_seq.wrapping_add(1);
        }
        input = rest;
    }
});
