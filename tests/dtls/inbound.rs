//! A whole flight arriving fragmented, reordered and duplicated.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use dtlskx::message::{fragment_message, HandshakeFragment};
use dtlskx::types::MessageType;
use dtlskx::{Config, Contribution, InboundFlight};

use crate::common::*;

/// ServerHello .. ServerHelloDone as the client receives them.
fn server_flight() -> Vec<(MessageType, Vec<u8>)> {
    vec![
        (MessageType::ServerHello, body(70)),
        (MessageType::Certificate, body(1800)),
        (MessageType::ServerKeyExchange, body(300)),
        (MessageType::CertificateRequest, body(40)),
        (MessageType::ServerHelloDone, Vec::new()),
    ]
}

fn fragments(first_seq: u16, flight: &[(MessageType, Vec<u8>)], max: usize) -> Vec<Vec<u8>> {
    flight
        .iter()
        .enumerate()
        .flat_map(|(i, (msg_type, body))| {
            fragment_message(*msg_type, first_seq + i as u16, body, max).unwrap()
        })
        .map(|b| b.to_vec())
        .collect()
}

fn feed(inbound: &mut InboundFlight, fragment: &[u8]) -> Contribution {
    let (_, parsed) = HandshakeFragment::parse(fragment).unwrap();
    inbound.contribute(&parsed.header, parsed.body)
}

#[test]
fn shuffled_flight_is_delivered_in_order() {
    let _ = env_logger::try_init();

    let flight = server_flight();
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..50 {
        let max = rng.gen_range(50..700);
        let mut all = fragments(1, &flight, max);
        // lose nothing, duplicate some
        let dups: Vec<_> = all
            .iter()
            .filter(|_| rng.gen_bool(0.2))
            .cloned()
            .collect();
        all.extend(dups);
        all.shuffle(&mut rng);

        let mut inbound = InboundFlight::starting_at(1, 16);
        let mut delivered = Vec::new();
        for fragment in &all {
            let contribution = feed(&mut inbound, fragment);
            assert_ne!(contribution, Contribution::Ignored);
            while let Some(message) = inbound.next_message() {
                delivered.push(message);
            }
        }

        assert_eq!(delivered.len(), flight.len());
        for (i, (message, (msg_type, body))) in delivered.iter().zip(&flight).enumerate() {
            assert_eq!(message.message_seq, 1 + i as u16);
            assert_eq!(message.msg_type, *msg_type);
            assert_eq!(&message.body, body);
        }
        assert_eq!(inbound.next_receive_seq(), 6);
        assert_eq!(inbound.pending_count(), 0);
    }
}

#[test]
fn retransmitted_flight_is_recognised() {
    let _ = env_logger::try_init();

    let flight = server_flight();
    let all = fragments(1, &flight, 500);

    let mut inbound = InboundFlight::starting_at(1, 16);
    for fragment in &all {
        feed(&mut inbound, fragment);
    }
    while inbound.next_message().is_some() {}

    // the peer did not see our reply and sends everything again
    for fragment in &all {
        assert_eq!(feed(&mut inbound, fragment), Contribution::PreviousFlight);
    }
    assert!(inbound.next_message().is_none());
}

#[test]
fn gap_holds_back_later_messages() {
    let _ = env_logger::try_init();

    let flight = server_flight();
    let all = fragments(0, &flight, 100);
    let (first, rest): (Vec<_>, Vec<_>) = all
        .iter()
        .partition(|f| HandshakeFragment::parse(f).unwrap().1.header.message_seq == 0);

    let mut inbound = InboundFlight::new(16);
    for fragment in &rest {
        feed(&mut inbound, fragment);
    }
    assert!(!inbound.has_next_message());
    assert_eq!(inbound.pending_count(), 4);

    for fragment in &first {
        feed(&mut inbound, fragment);
    }
    let seqs: Vec<_> = std::iter::from_fn(|| inbound.next_message())
        .map(|m| m.message_seq)
        .collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
}

#[test]
fn receive_ahead_limit() {
    let _ = env_logger::try_init();

    let config = Config::builder().max_receive_ahead(2).build().unwrap();
    let mut inbound = InboundFlight::from_config(&config);
    let h = header(MessageType::Finished, 3, 1, 0, 1);
    assert_eq!(inbound.contribute(&h, &[0]), Contribution::Ignored);
    assert_eq!(inbound.pending_count(), 0);

    let h = header(MessageType::Finished, 2, 1, 0, 1);
    assert_eq!(inbound.contribute(&h, &[0]), Contribution::Accepted);
    assert_eq!(inbound.pending_count(), 1);
}

#[test]
fn oversized_messages_are_not_buffered() {
    let _ = env_logger::try_init();

    let mut inbound = InboundFlight::new(16);

    // a forged one byte fragment per sequence, each announcing a 16 MiB body
    for seq in 0..=16 {
        let h = header(MessageType::Certificate, seq, 0xFF_FFFF, 0, 1);
        assert_eq!(inbound.contribute(&h, &[0]), Contribution::Ignored, "seq {}", seq);
    }
    assert_eq!(inbound.pending_count(), 0);

    // the real message still gets through
    let h = header(MessageType::Certificate, 0, 4, 0, 4);
    assert_eq!(inbound.contribute(&h, &[1, 2, 3, 4]), Contribution::Accepted);
    assert_eq!(inbound.next_message().unwrap().body, vec![1, 2, 3, 4]);
}

#[test]
fn message_size_limit_from_config() {
    let _ = env_logger::try_init();

    let config = Config::builder()
        .max_handshake_message_size(2000)
        .build()
        .unwrap();
    let mut inbound = InboundFlight::from_config(&config);

    let h = header(MessageType::Certificate, 0, 2001, 0, 1);
    assert_eq!(inbound.contribute(&h, &[0]), Contribution::Ignored);

    let h = header(MessageType::Certificate, 0, 2000, 0, 1);
    assert_eq!(inbound.contribute(&h, &[0]), Contribution::Accepted);
    assert_eq!(inbound.pending_count(), 1);
}

#[test]
fn reset_drops_partial_messages() {
    let _ = env_logger::try_init();

    let mut inbound = InboundFlight::new(16);
    let h = header(MessageType::Certificate, 0, 10, 0, 5);
    assert_eq!(inbound.contribute(&h, &[1; 5]), Contribution::Accepted);
    assert_eq!(inbound.pending_count(), 1);

    inbound.reset(1);
    assert_eq!(inbound.pending_count(), 0);
    assert_eq!(inbound.next_receive_seq(), 1);

    let old = header(MessageType::Certificate, 0, 10, 5, 5);
    assert_eq!(inbound.contribute(&old, &[1; 5]), Contribution::PreviousFlight);
}

#[test]
fn forged_header_cannot_poison_a_message() {
    let _ = env_logger::try_init();

    let full = body(20);
    let mut inbound = InboundFlight::new(16);

    let genuine = header(MessageType::Certificate, 0, 20, 0, 10);
    assert_eq!(inbound.contribute(&genuine, &full[..10]), Contribution::Accepted);

    // same message_seq claiming another type or size
    let forged = header(MessageType::Finished, 0, 20, 10, 10);
    assert_eq!(inbound.contribute(&forged, &[0xFF; 10]), Contribution::Ignored);
    let forged = header(MessageType::Certificate, 0, 30, 10, 10);
    assert_eq!(inbound.contribute(&forged, &[0xFF; 10]), Contribution::Ignored);
    // fragment_offset + fragment_length overflowing 32 bits
    let forged = header(MessageType::Certificate, 0, 20, 0, 10);
    let forged = dtlskx::message::HandshakeHeader {
        fragment_offset: u32::MAX,
        ..forged
    };
    assert_eq!(inbound.contribute(&forged, &[0xFF; 10]), Contribution::Ignored);

    let rest = header(MessageType::Certificate, 0, 20, 10, 10);
    assert_eq!(inbound.contribute(&rest, &full[10..]), Contribution::Accepted);
    assert_eq!(inbound.next_message().unwrap().body, full);
}
