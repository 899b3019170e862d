//! Shared helpers for key exchange integration tests.

#![allow(unused)]

use std::sync::{Arc, OnceLock};

use dtlskx::crypto::rust_crypto::RsaKeyPair;
use dtlskx::crypto::{CertificateChain, Credentials, DhGroup, SrpGroup, TlsCertificate};
use dtlskx::kx::{ClientKxConfig, KeyExchange, KxContext, PreMasterSecret, ServerKxConfig};
use dtlskx::types::{ClientCertificateType, KeyExchangeAlgorithm, ProtocolVersion};
use dtlskx::types::SignatureAndHashAlgorithm;
use dtlskx::{Config, Error};

/// 2^64 - 59, the largest 64-bit prime. Far too small for real use, fast
/// enough for tests.
pub const TEST_PRIME: [u8; 8] = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xC5];

pub fn dh_group() -> DhGroup {
    DhGroup::new(&TEST_PRIME, &[5])
}

pub fn srp_group() -> SrpGroup {
    SrpGroup::new(&TEST_PRIME, &[5])
}

/// Config that accepts the toy test groups.
pub fn config() -> Config {
    Config::builder()
        .min_dh_group_bits(64)
        .build()
        .expect("test config")
}

pub fn context(version: ProtocolVersion) -> KxContext {
    KxContext {
        version,
        client_version: version,
        client_random: [0x11; 32],
        server_random: [0x22; 32],
    }
}

/// Check a ServerKeyExchange signature made under [`context`].
pub fn check_signature(
    chain: &CertificateChain,
    algorithm: SignatureAndHashAlgorithm,
    params: &[u8],
    signature: &[u8],
) -> Result<(), String> {
    let ctx = context(ProtocolVersion::DTLS1_2);
    let mut data = ctx.client_random.to_vec();
    data.extend_from_slice(&ctx.server_random);
    data.extend_from_slice(params);

    let cert = chain.end_entity().expect("end entity");
    cert.create_verifier(algorithm.signature)?
        .verify(algorithm, &data, signature)
}

/// RSA key generation is slow, share one key across tests.
pub fn rsa_key() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(1024).expect("RSA key"))
}

pub fn client(algorithm: KeyExchangeAlgorithm) -> KeyExchange {
    KeyExchange::new_client(algorithm, ClientKxConfig::new(&config()))
}

pub fn server(algorithm: KeyExchangeAlgorithm) -> KeyExchange {
    KeyExchange::new_server(algorithm, ServerKxConfig::new(&config()))
}

/// Everything one side observed during a run.
#[derive(Debug, Default)]
pub struct Transcript {
    pub server_key_exchange: Option<Vec<u8>>,
    pub certificate_types: Option<Vec<ClientCertificateType>>,
    pub client_key_exchange: Vec<u8>,
}

/// Drive both sides through the whole call sequence.
pub fn run(
    client: &mut KeyExchange,
    server: &mut KeyExchange,
    server_credentials: Option<Credentials>,
    client_credentials: Option<Credentials>,
) -> Result<(PreMasterSecret, PreMasterSecret, Transcript), Error> {
    run_with(
        client,
        server,
        context(ProtocolVersion::DTLS1_2),
        server_credentials,
        client_credentials,
        |ske| ske,
    )
}

/// Like [`run`] with control over the context and the ServerKeyExchange in flight.
pub fn run_with(
    client: &mut KeyExchange,
    server: &mut KeyExchange,
    context: KxContext,
    server_credentials: Option<Credentials>,
    client_credentials: Option<Credentials>,
    alter_ske: impl FnOnce(Vec<u8>) -> Vec<u8>,
) -> Result<(PreMasterSecret, PreMasterSecret, Transcript), Error> {
    let mut transcript = Transcript::default();

    client.init(context.clone())?;
    server.init(context)?;

    match server_credentials {
        Some(credentials) => {
            let chain = credentials.chain().clone();
            server.process_server_credentials(credentials)?;
            client.process_server_certificate(&chain)?;
        }
        None => {
            server.skip_server_credentials()?;
            client.skip_server_credentials()?;
        }
    }

    match server.generate_server_key_exchange()? {
        Some(ske) => {
            transcript.server_key_exchange = Some(ske.clone());
            client.process_server_key_exchange(&alter_ske(ske))?;
        }
        None => client.skip_server_key_exchange()?,
    }

    transcript.certificate_types = server.client_certificate_types()?;
    assert_eq!(client.client_certificate_types()?, transcript.certificate_types);

    match client_credentials {
        Some(credentials) => {
            let chain = credentials.chain().clone();
            client.process_client_credentials(credentials)?;
            server.process_client_certificate(&chain)?;
        }
        None => {
            client.skip_client_credentials()?;
            server.skip_client_credentials()?;
        }
    }

    let cke = client.generate_client_key_exchange()?;
    server.process_client_key_exchange(&cke)?;
    transcript.client_key_exchange = cke;

    let client_secret = client.generate_pre_master_secret()?;
    let server_secret = server.generate_pre_master_secret()?;
    Ok((client_secret, server_secret, transcript))
}

pub fn assert_same(client: &PreMasterSecret, server: &PreMasterSecret) {
    assert!(!client.is_empty());
    assert_eq!(client.as_bytes(), server.as_bytes());
}
