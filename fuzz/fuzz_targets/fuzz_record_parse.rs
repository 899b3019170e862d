#![no_main]

//! Fuzz target for DTLS record and handshake header parsing.
//!
//! DTLS 1.2 record format:
//! - ContentType: 1 byte
//! - ProtocolVersion: 2 bytes (0xFEFD for DTLS 1.2, 0xFEFF for DTLS 1.0)
//! - Epoch: 2 bytes
//! - Sequence Number: 6 bytes (u48)
//! - Length: 2 bytes
//! - Fragment: variable (up to 2^14 bytes for plaintext)

use libfuzzer_sys::fuzz_target;

use dtlskx::message::HandshakeFragment;
use dtlskx::record::{receive_client_hello_record, DtlsRecord, RECORD_HEADER_LEN};
use dtlskx::types::MAX_SEQUENCE_NUMBER;

/// Maximum DTLS fragment size
const MAX_FRAGMENT_SIZE: usize = 16384;

fuzz_target!(|data: &[u8]| {
    // Walk every record of the datagram as-is
    let mut input = data;
    while let Ok((rest, record)) = DtlsRecord::parse(input) {
        assert!(record.header.sequence.sequence_number <= MAX_SEQUENCE_NUMBER);
        assert_eq!(record.fragment.len(), record.header.length as usize);
        let _ = HandshakeFragment::parse(record.fragment);
        input = rest;
    }

    if let Some(hello) = receive_client_hello_record(data) {
        assert!(hello.fragment.len() <= MAX_FRAGMENT_SIZE);
        assert!(hello.fragment.len() + RECORD_HEADER_LEN <= data.len());
    }

    // Same bytes behind a valid handshake record header
    if !data.is_empty() {
        let frag_len = data.len().min(MAX_FRAGMENT_SIZE);

        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + frag_len);
        record.push(22u8); // ContentType::Handshake
        record.extend_from_slice(&[0xFE, 0xFD]); // DTLS 1.2 version
        record.extend_from_slice(&[0, 0]); // epoch 0
        record.extend_from_slice(&[0, 0, 0, 0, 0, 1]); // sequence 1
        record.extend_from_slice(&(frag_len as u16).to_be_bytes());
        record.extend_from_slice(&data[..frag_len]);

        let hello = receive_client_hello_record(&record).expect("well formed record");
        assert_eq!(hello.record_seq, 1);
        let _ = HandshakeFragment::parse(hello.fragment);
    }
});
