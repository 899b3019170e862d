#![no_main]

//! Fuzz target for peer supplied key exchange messages.
//!
//! The first byte picks an algorithm, the rest is fed to the client as a
//! ServerKeyExchange. Errors are expected, panics are not.

use libfuzzer_sys::fuzz_target;

use dtlskx::kx::{ClientKxConfig, KeyExchange, KxContext};
use dtlskx::types::{KeyExchangeAlgorithm, ProtocolVersion};
use dtlskx::Config;

const ALGORITHMS: &[KeyExchangeAlgorithm] = &[
    KeyExchangeAlgorithm::DH_anon,
    KeyExchangeAlgorithm::ECDH_anon,
    KeyExchangeAlgorithm::PSK,
    KeyExchangeAlgorithm::DHE_PSK,
    KeyExchangeAlgorithm::ECDHE_PSK,
    KeyExchangeAlgorithm::SRP,
];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let algorithm = ALGORITHMS[selector as usize % ALGORITHMS.len()];

    let config = Config::builder()
        .min_dh_group_bits(64)
        .build()
        .expect("config");
    let mut client = KeyExchange::new_client(algorithm, ClientKxConfig::new(&config));
    client
        .init(KxContext {
            version: ProtocolVersion::DTLS1_2,
            client_version: ProtocolVersion::DTLS1_2,
            client_random: [1; 32],
            server_random: [2; 32],
        })
        .expect("init");
    client.skip_server_credentials().expect("anonymous");

    if client.process_server_key_exchange(body).is_err() {
        // a failed exchange stays failed
        assert!(client.skip_client_credentials().is_err());
    }
});
