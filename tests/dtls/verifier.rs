//! Stateless cookie exchange.

use std::sync::Arc;
use std::thread;

use dtlskx::transport::MemorySender;
use dtlskx::types::{MessageType, ProtocolVersion};
use dtlskx::{Config, CookieVerifier, COOKIE_LEN};

use crate::common::*;

const CLIENT: &[u8] = b"192.0.2.1:5684";

fn verifier() -> CookieVerifier {
    CookieVerifier::new(&Config::default()).unwrap()
}

/// Run the first leg and return the issued cookie.
fn first_leg(verifier: &CookieVerifier, client_id: &[u8], random: u8) -> Vec<u8> {
    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 0, random, &[]);
    assert!(verifier.verify_request(client_id, &hello, &mut sender).is_none());
    assert_eq!(sender.sent.len(), 1);
    cookie_of(&sender.sent[0])
}

#[test]
fn hello_without_cookie_gets_hello_verify_request() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 5, 1, &[]);

    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    assert_eq!(sender.sent.len(), 1);

    let hvr = &sender.sent[0];
    // DTLS 1.0 handshake record echoing the record sequence
    assert_eq!(&hvr[..5], &[22, 0xFE, 0xFF, 0, 0]);
    assert_eq!(&hvr[5..11], &[0, 0, 0, 0, 0, 5]);
    assert_eq!(hvr[13], MessageType::HelloVerifyRequest.as_u8());
    assert_eq!(cookie_of(hvr).len(), COOKIE_LEN);
}

#[test]
fn returned_cookie_is_accepted() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let cookie = first_leg(&verifier, CLIENT, 1);

    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &cookie);
    let request = verifier.verify_request(CLIENT, &hello, &mut sender).unwrap();

    assert!(sender.sent.is_empty());
    assert_eq!(request.record_seq, 1);
    assert_eq!(request.message, hello[13..].to_vec());
    assert_eq!(request.client_hello.client_version, ProtocolVersion::DTLS1_2);
    assert_eq!(request.client_hello.random, [1; 32]);
    assert_eq!(request.client_hello.session_id, vec![0xEE; 8]);
    assert_eq!(request.client_hello.cookie, cookie);
}

#[test]
fn cookie_does_not_depend_on_record_sequence() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let cookie = first_leg(&verifier, CLIENT, 1);

    for record_seq in [0, 7, 1 << 40] {
        let mut sender = MemorySender::new(1500);
        let hello = client_hello(ProtocolVersion::DTLS1_2, record_seq, 1, &cookie);
        let request = verifier.verify_request(CLIENT, &hello, &mut sender).unwrap();
        assert_eq!(request.record_seq, record_seq);
    }
}

#[test]
fn cookie_is_bound_to_client() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let cookie = first_leg(&verifier, CLIENT, 1);

    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &cookie);
    assert!(verifier
        .verify_request(b"198.51.100.7:5684", &hello, &mut sender)
        .is_none());

    // the other client is told its own cookie
    assert_eq!(sender.sent.len(), 1);
    assert_ne!(cookie_of(&sender.sent[0]), cookie);
}

#[test]
fn cookie_is_bound_to_hello() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let cookie = first_leg(&verifier, CLIENT, 1);

    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 2, &cookie);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    assert_eq!(sender.sent.len(), 1);
}

#[test]
fn wrong_cookie_is_answered_with_the_right_one() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let cookie = first_leg(&verifier, CLIENT, 1);

    let mut forged = cookie.clone();
    forged[0] ^= 1;
    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &forged);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    assert_eq!(cookie_of(&sender.sent[0]), cookie);

    // a truncated cookie fails the same way
    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &cookie[..16]);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    assert_eq!(cookie_of(&sender.sent[0]), cookie);
}

#[test]
fn verifiers_use_independent_keys() {
    let _ = env_logger::try_init();

    let a = first_leg(&verifier(), CLIENT, 1);
    let b = first_leg(&verifier(), CLIENT, 1);
    assert_ne!(a, b);
}

#[test]
fn configured_cookie_length() {
    let _ = env_logger::try_init();

    let config = Config::builder().max_cookie_length(16).build().unwrap();
    let verifier = CookieVerifier::new(&config).unwrap();
    let cookie = first_leg(&verifier, CLIENT, 1);
    assert_eq!(cookie.len(), 16);

    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &cookie);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_some());

    // longer than allowed is not a ClientHello we answer
    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &[0; 17]);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    assert!(sender.sent.is_empty());
}

#[test]
fn dtls1_0_cookie_limit() {
    let _ = env_logger::try_init();

    let config = Config::builder().max_cookie_length(255).build().unwrap();
    let verifier = CookieVerifier::new(&config).unwrap();

    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_0, 0, 1, &[]);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    let cookie = cookie_of(&sender.sent[0]);
    assert_eq!(cookie.len(), 32);

    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_0, 1, 1, &cookie);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_some());

    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_0, 1, 1, &[0; 33]);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    assert!(sender.sent.is_empty());
}

#[test]
fn non_client_hello_is_ignored() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let body = client_hello_body(ProtocolVersion::DTLS1_2, 1, &[]);

    let mut datagrams = vec![
        Vec::new(),
        vec![0x16, 0xFE, 0xFD],
        // wrong handshake type
        handshake_record(
            ProtocolVersion::DTLS1_2,
            0,
            &handshake_message(MessageType::ServerHello, 0, &body),
        ),
        // not a DTLS version
        handshake_record(
            ProtocolVersion::TLS1_2,
            0,
            &handshake_message(MessageType::ClientHello, 0, &body),
        ),
        // body cut short
        handshake_record(
            ProtocolVersion::DTLS1_2,
            0,
            &handshake_message(MessageType::ClientHello, 0, &body[..30]),
        ),
    ];

    // a fragment rather than the whole message
    let mut fragment = Vec::new();
    let mut buf = dtlskx::Buf::new();
    header(MessageType::ClientHello, 0, body.len(), 0, 20).serialize(&mut buf);
    fragment.extend_from_slice(&buf);
    fragment.extend_from_slice(&body[..20]);
    datagrams.push(handshake_record(ProtocolVersion::DTLS1_2, 0, &fragment));

    // trailing bytes after the message in the same record
    let mut trailing = handshake_message(MessageType::ClientHello, 0, &body);
    trailing.push(0);
    datagrams.push(handshake_record(ProtocolVersion::DTLS1_2, 0, &trailing));

    // record length beyond the datagram
    let mut truncated = client_hello(ProtocolVersion::DTLS1_2, 0, 1, &[]);
    truncated.pop();
    datagrams.push(truncated);

    for datagram in datagrams {
        let mut sender = MemorySender::new(1500);
        assert!(verifier.verify_request(CLIENT, &datagram, &mut sender).is_none());
        assert!(sender.sent.is_empty(), "answered {:02x?}", datagram);
    }
}

#[test]
fn later_records_in_the_datagram_are_ignored() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let cookie = first_leg(&verifier, CLIENT, 1);

    let mut datagram = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &cookie);
    datagram.extend_from_slice(&[0x17, 0xFE, 0xFD, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2, 9, 9]);

    let mut sender = MemorySender::new(1500);
    let request = verifier.verify_request(CLIENT, &datagram, &mut sender).unwrap();
    assert_eq!(request.client_hello.cookie, cookie);
}

#[test]
fn send_failure_is_not_fatal() {
    let _ = env_logger::try_init();

    let verifier = verifier();
    let mut sender = MemorySender::new(10);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 0, 1, &[]);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_none());
    assert!(sender.sent.is_empty());

    // the verifier keeps working
    let cookie = first_leg(&verifier, CLIENT, 1);
    let mut sender = MemorySender::new(1500);
    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, 1, &cookie);
    assert!(verifier.verify_request(CLIENT, &hello, &mut sender).is_some());
}

#[test]
fn shared_between_threads() {
    let _ = env_logger::try_init();

    let verifier = Arc::new(verifier());
    let handles: Vec<_> = (0..8u8)
        .map(|n| {
            let verifier = verifier.clone();
            thread::spawn(move || {
                let client_id = [n; 6];
                for round in 0..50u8 {
                    let random = n.wrapping_mul(50).wrapping_add(round);
                    let cookie = first_leg(&verifier, &client_id, random);
                    let mut sender = MemorySender::new(1500);
                    let hello = client_hello(ProtocolVersion::DTLS1_2, 1, random, &cookie);
                    assert!(verifier.verify_request(&client_id, &hello, &mut sender).is_some());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
