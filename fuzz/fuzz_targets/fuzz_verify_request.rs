#![no_main]

//! Fuzz target for the stateless cookie exchange.
//!
//! Arbitrary datagrams must never be accepted without a cookie the verifier
//! issued, and any HelloVerifyRequest sent must fit the send limit.

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

use dtlskx::transport::MemorySender;
use dtlskx::{Config, CookieVerifier};

fn verifier() -> &'static CookieVerifier {
    static VERIFIER: OnceLock<CookieVerifier> = OnceLock::new();
    VERIFIER.get_or_init(|| CookieVerifier::new(&Config::default()).expect("verifier"))
}

fuzz_target!(|data: &[u8]| {
    let (client_id, datagram) = data.split_at(data.len().min(6));

    let mut sender = MemorySender::new(1200);
    if let Some(request) = verifier().verify_request(client_id, datagram, &mut sender) {
        // a guessed cookie; only possible with a forged MAC
        assert!(sender.sent.is_empty());
        assert!(!request.client_hello.cookie.is_empty());
    }
    assert!(sender.sent.len() <= 1);
    assert!(sender.sent.iter().all(|d| d.len() <= 1200));
});
