//! Finite field Diffie-Hellman: static, ephemeral and anonymous.

use std::sync::Arc;

use dtlskx::crypto::rust_crypto::generate_dh;
use dtlskx::crypto::DhGroup;
use dtlskx::kx::{ClientKxConfig, DefaultDhGroupVerifier, KeyExchange, ServerKxConfig};
use dtlskx::types::{ClientCertificateType, KeyExchangeAlgorithm, ProtocolVersion};
use dtlskx::types::{HashAlgorithm, SignatureAlgorithm, SignatureAndHashAlgorithm};
use dtlskx::{AlertDescription, Config};

use crate::common::*;

fn dh_server(algorithm: KeyExchangeAlgorithm) -> KeyExchange {
    KeyExchange::new_server(
        algorithm,
        ServerKxConfig::new(&config()).with_dh_group(dh_group()),
    )
}

#[test]
fn dh_anon_agrees() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DH_anon);
    let mut server = dh_server(KeyExchangeAlgorithm::DH_anon);

    let (c, s, transcript) = run(&mut client, &mut server, None, None).unwrap();
    assert_same(&c, &s);
    assert!(c.len() <= TEST_PRIME.len());
    assert_eq!(transcript.certificate_types, None);

    // opaque16 p, g, Ys and nothing else
    let ske = transcript.server_key_exchange.unwrap();
    assert_eq!(&ske[..2], &[0, 8]);
    assert_eq!(&ske[2..10], &TEST_PRIME);
    assert_eq!(&ske[10..13], &[0, 1, 5]);
}

#[test]
fn dhe_rsa_agrees() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DHE_RSA);
    let mut server = dh_server(KeyExchangeAlgorithm::DHE_RSA);
    let credentials = rsa_key().signer();

    let (c, s, transcript) = run(&mut client, &mut server, Some(credentials), None).unwrap();
    assert_same(&c, &s);
    assert_eq!(
        transcript.certificate_types,
        Some(vec![
            ClientCertificateType::EcdsaSign,
            ClientCertificateType::RsaSign,
            ClientCertificateType::DssSign
        ])
    );
}

#[test]
fn dhe_rsa_without_signature_algorithm_before_1_2() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DHE_RSA);
    let mut server = dh_server(KeyExchangeAlgorithm::DHE_RSA);
    let credentials = rsa_key().signer();

    let (c, s, transcript) = run_with(
        &mut client,
        &mut server,
        context(ProtocolVersion::DTLS1_0),
        Some(credentials),
        None,
        |ske| ske,
    )
    .unwrap();
    assert_same(&c, &s);

    // params then opaque16 signature, 128 bytes for RSA-1024
    let ske = transcript.server_key_exchange.unwrap();
    let sig = &ske[ske.len() - 130..];
    assert_eq!(&sig[..2], &[0, 128]);

    // RSA before 1.2 signs MD5 ‖ SHA-1
    let params = &ske[..ske.len() - 130];
    let legacy = SignatureAndHashAlgorithm::new(HashAlgorithm::Md5Sha1, SignatureAlgorithm::Rsa);
    check_signature(rsa_key().chain(), legacy, params, &sig[2..]).unwrap();
    let modern = SignatureAndHashAlgorithm::new(HashAlgorithm::Sha256, SignatureAlgorithm::Rsa);
    assert!(check_signature(rsa_key().chain(), modern, params, &sig[2..]).is_err());
}

#[test]
fn small_group_rejected_by_default() {
    let _ = env_logger::try_init();

    let mut client = KeyExchange::new_client(
        KeyExchangeAlgorithm::DH_anon,
        ClientKxConfig::new(&Config::default()),
    );
    let mut server = dh_server(KeyExchangeAlgorithm::DH_anon);

    let err = run(&mut client, &mut server, None, None).unwrap_err();
    assert_eq!(err.alert(), AlertDescription::InsufficientSecurity);
}

#[test]
fn custom_group_verifier() {
    let _ = env_logger::try_init();

    let verifier = Arc::new(DefaultDhGroupVerifier { min_bits: 128 });
    let mut client = KeyExchange::new_client(
        KeyExchangeAlgorithm::DH_anon,
        ClientKxConfig::new(&config()).with_dh_verifier(verifier),
    );
    let mut server = dh_server(KeyExchangeAlgorithm::DH_anon);

    let err = run(&mut client, &mut server, None, None).unwrap_err();
    assert_eq!(err.alert(), AlertDescription::InsufficientSecurity);
}

#[test]
fn server_without_group_is_internal_error() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DH_anon);
    let mut server = server(KeyExchangeAlgorithm::DH_anon);

    let err = run(&mut client, &mut server, None, None).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn client_public_out_of_range() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DH_anon);
    let mut server = dh_server(KeyExchangeAlgorithm::DH_anon);
    let ctx = context(ProtocolVersion::DTLS1_2);

    client.init(ctx.clone()).unwrap();
    server.init(ctx).unwrap();
    server.skip_server_credentials().unwrap();
    client.skip_server_credentials().unwrap();
    let ske = server.generate_server_key_exchange().unwrap().unwrap();
    client.process_server_key_exchange(&ske).unwrap();
    server.skip_client_credentials().unwrap();

    // Yc = 1
    let err = server.process_client_key_exchange(&[0, 1, 1]).unwrap_err();
    assert_eq!(err.alert(), AlertDescription::IllegalParameter);
}

#[test]
fn static_dh_with_ephemeral_client() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DH_RSA);
    let mut server = server(KeyExchangeAlgorithm::DH_RSA);
    let credentials = generate_dh(&dh_group()).unwrap();

    let (c, s, transcript) = run(&mut client, &mut server, Some(credentials), None).unwrap();
    assert_same(&c, &s);
    assert_eq!(transcript.server_key_exchange, None);
    assert_eq!(
        transcript.certificate_types,
        Some(vec![
            ClientCertificateType::RsaFixedDh,
            ClientCertificateType::DssFixedDh
        ])
    );
    // opaque16 Yc
    let cke = &transcript.client_key_exchange;
    assert_eq!(cke.len(), 2 + u16::from_be_bytes([cke[0], cke[1]]) as usize);
}

#[test]
fn static_dh_with_fixed_client_key_sends_empty_exchange() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DH_DSS);
    let mut server = server(KeyExchangeAlgorithm::DH_DSS);
    let server_credentials = generate_dh(&dh_group()).unwrap();
    let client_credentials = generate_dh(&dh_group()).unwrap();

    let (c, s, transcript) = run(
        &mut client,
        &mut server,
        Some(server_credentials),
        Some(client_credentials),
    )
    .unwrap();
    assert_same(&c, &s);
    assert!(transcript.client_key_exchange.is_empty());
}

#[test]
fn static_dh_certificate_in_other_group_is_rejected() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::DH_RSA);
    let mut server = server(KeyExchangeAlgorithm::DH_RSA);
    // 2^61 - 1 is prime but below the 64 bit minimum
    let small = DhGroup::new(&[0x1F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF], &[3]);
    let credentials = generate_dh(&small).unwrap();

    let err = run(&mut client, &mut server, Some(credentials), None).unwrap_err();
    assert_eq!(err.alert(), AlertDescription::InsufficientSecurity);
}
