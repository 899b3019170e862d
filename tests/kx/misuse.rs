//! Calls out of order, on the wrong side, or with the wrong message.

use std::sync::Arc;

use zeroize::Zeroizing;

use dtlskx::crypto::rust_crypto::{generate_dh, generate_ecdh, generate_ecdsa};
use dtlskx::crypto::{AgreementDomain, CertificateChain, CertificateRole, Credentials};
use dtlskx::crypto::{Encryptor, SignatureVerifier, TlsCertificate};
use dtlskx::kx::{client_certificate_types, Capabilities, KeyExchange};
use dtlskx::kx::{PskIdentityManager, ServerKxConfig, SrpLoginParameters};
use dtlskx::types::{KeyExchangeAlgorithm, NamedGroup, ProtocolVersion};
use dtlskx::types::{SignatureAlgorithm, SignatureAndHashAlgorithm};
use dtlskx::AlertDescription;

use crate::common::*;

#[test]
fn out_of_order_call_fails_the_exchange() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::ECDH_anon);

    // before init
    let err = client.skip_server_credentials().unwrap_err();
    assert!(err.is_internal());

    // nothing works afterwards, not even init
    let err = client.init(context(ProtocolVersion::DTLS1_2)).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn skipping_ahead_fails_the_exchange() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::ECDH_anon);
    client.init(context(ProtocolVersion::DTLS1_2)).unwrap();

    let err = client.generate_client_key_exchange().unwrap_err();
    assert!(err.is_internal());

    let err = client.skip_server_credentials().unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn wrong_role_is_internal_error() {
    let _ = env_logger::try_init();

    let mut server = server(KeyExchangeAlgorithm::ECDH_anon);
    server.init(context(ProtocolVersion::DTLS1_2)).unwrap();
    server.skip_server_credentials().unwrap();

    let err = server.skip_server_key_exchange().unwrap_err();
    assert!(err.is_internal());

    let err = server.generate_server_key_exchange().unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn client_cannot_take_server_credentials() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::RSA);
    client.init(context(ProtocolVersion::DTLS1_2)).unwrap();

    let err = client
        .process_server_credentials(rsa_key().decryptor())
        .unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn pre_master_secret_is_taken_once() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::ECDH_anon);
    let mut server = server(KeyExchangeAlgorithm::ECDH_anon);
    run(&mut client, &mut server, None, None).unwrap();

    let err = client.generate_pre_master_secret().unwrap_err();
    assert!(err.is_internal());
    let err = server.generate_pre_master_secret().unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn missing_server_certificate_is_unexpected_message() {
    let _ = env_logger::try_init();

    for algorithm in [
        KeyExchangeAlgorithm::RSA,
        KeyExchangeAlgorithm::DHE_RSA,
        KeyExchangeAlgorithm::ECDH_ECDSA,
        KeyExchangeAlgorithm::RSA_PSK,
        KeyExchangeAlgorithm::SRP_RSA,
    ] {
        let mut client = client(algorithm);
        client.init(context(ProtocolVersion::DTLS1_2)).unwrap();

        let err = client.skip_server_credentials().unwrap_err();
        assert_eq!(err.alert(), AlertDescription::UnexpectedMessage, "{:?}", algorithm);
    }
}

#[test]
fn empty_server_chain_is_bad_certificate() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::ECDHE_ECDSA);
    client.init(context(ProtocolVersion::DTLS1_2)).unwrap();

    let err = client
        .process_server_certificate(&CertificateChain::empty())
        .unwrap_err();
    assert_eq!(err.alert(), AlertDescription::BadCertificate);
}

#[test]
fn certificate_for_certificate_less_exchange_is_internal_error() {
    let _ = env_logger::try_init();

    let credentials = generate_ecdsa(NamedGroup::Secp256r1).unwrap();

    for algorithm in ALL_ALGORITHMS {
        if Capabilities::of(algorithm).requires_server_certificate {
            continue;
        }
        let mut client = client(algorithm);
        client.init(context(ProtocolVersion::DTLS1_2)).unwrap();

        let err = client
            .process_server_certificate(credentials.chain())
            .unwrap_err();
        assert!(err.is_internal(), "{:?}: {}", algorithm, err);
    }
}

#[test]
fn client_certificate_for_certificate_less_exchange_is_internal_error() {
    let _ = env_logger::try_init();

    let credentials = generate_ecdsa(NamedGroup::Secp256r1).unwrap();

    // SRP_DSS is left out, there is no DSA signer to stand up its server
    for algorithm in [
        KeyExchangeAlgorithm::DH_anon,
        KeyExchangeAlgorithm::ECDH_anon,
        KeyExchangeAlgorithm::PSK,
        KeyExchangeAlgorithm::DHE_PSK,
        KeyExchangeAlgorithm::ECDHE_PSK,
        KeyExchangeAlgorithm::RSA_PSK,
        KeyExchangeAlgorithm::SRP,
        KeyExchangeAlgorithm::SRP_RSA,
    ] {
        assert!(client_certificate_types(algorithm).is_none());

        let mut server = complete_server(algorithm);
        server.init(context(ProtocolVersion::DTLS1_2)).unwrap();
        match algorithm {
            KeyExchangeAlgorithm::RSA_PSK => server.process_server_credentials(rsa_key().decryptor()),
            KeyExchangeAlgorithm::SRP_RSA => server.process_server_credentials(rsa_key().signer()),
            _ => server.skip_server_credentials(),
        }
        .unwrap();
        server.generate_server_key_exchange().unwrap();

        let err = server
            .process_client_certificate(credentials.chain())
            .unwrap_err();
        assert!(err.is_internal(), "{:?}: {}", algorithm, err);
    }
}

#[test]
fn server_key_exchange_for_rsa_is_internal_error() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::RSA);
    client.init(context(ProtocolVersion::DTLS1_2)).unwrap();
    client
        .process_server_certificate(rsa_key().decryptor().chain())
        .unwrap();

    let err = client.process_server_key_exchange(&[0, 0]).unwrap_err();
    assert!(err.is_internal(), "{}", err);
}

/// What each algorithm does with the messages around ServerKeyExchange.
#[test]
fn server_key_exchange_rules_for_every_algorithm() {
    let _ = env_logger::try_init();

    for algorithm in ALL_ALGORITHMS {
        let capabilities = Capabilities::of(algorithm);
        let optional_hint = matches!(
            algorithm,
            KeyExchangeAlgorithm::PSK | KeyExchangeAlgorithm::RSA_PSK
        );

        // a client that got exactly the certificate the algorithm wants
        let ready_client = || {
            let mut client = client(algorithm);
            client.init(context(ProtocolVersion::DTLS1_2)).unwrap();
            match server_chain(algorithm) {
                Some(chain) => client.process_server_certificate(&chain),
                None => client.skip_server_credentials(),
            }
            .unwrap_or_else(|e| panic!("{:?}: {}", algorithm, e));
            client
        };

        let skipped = ready_client().skip_server_key_exchange();
        if capabilities.requires_server_key_exchange {
            let err = skipped.unwrap_err();
            assert_eq!(err.alert(), AlertDescription::UnexpectedMessage, "{:?}", algorithm);
        } else {
            assert!(skipped.is_ok(), "{:?}", algorithm);
        }

        let received = ready_client().process_server_key_exchange(&[0, 0]);
        if !capabilities.requires_server_key_exchange && !optional_hint {
            let err = received.unwrap_err();
            assert!(err.is_internal(), "{:?}: {}", algorithm, err);
        } else if let Err(err) = received {
            // parsed and found wanting, never refused outright
            assert!(!err.is_internal(), "{:?}: {}", algorithm, err);
        }

        // certificates for algorithms without one
        if !capabilities.requires_server_certificate {
            let mut client = client(algorithm);
            client.init(context(ProtocolVersion::DTLS1_2)).unwrap();
            let err = client
                .process_server_certificate(rsa_key().chain())
                .unwrap_err();
            assert!(err.is_internal(), "{:?}: {}", algorithm, err);
        }
    }
}

const ALL_ALGORITHMS: [KeyExchangeAlgorithm; 18] = [
    KeyExchangeAlgorithm::DH_DSS,
    KeyExchangeAlgorithm::DH_RSA,
    KeyExchangeAlgorithm::ECDH_ECDSA,
    KeyExchangeAlgorithm::ECDH_RSA,
    KeyExchangeAlgorithm::DHE_DSS,
    KeyExchangeAlgorithm::DHE_RSA,
    KeyExchangeAlgorithm::ECDHE_ECDSA,
    KeyExchangeAlgorithm::ECDHE_RSA,
    KeyExchangeAlgorithm::DH_anon,
    KeyExchangeAlgorithm::ECDH_anon,
    KeyExchangeAlgorithm::RSA,
    KeyExchangeAlgorithm::PSK,
    KeyExchangeAlgorithm::DHE_PSK,
    KeyExchangeAlgorithm::ECDHE_PSK,
    KeyExchangeAlgorithm::RSA_PSK,
    KeyExchangeAlgorithm::SRP,
    KeyExchangeAlgorithm::SRP_DSS,
    KeyExchangeAlgorithm::SRP_RSA,
];

/// The server Certificate a client of `algorithm` accepts, if any.
fn server_chain(algorithm: KeyExchangeAlgorithm) -> Option<CertificateChain> {
    use KeyExchangeAlgorithm::*;
    let chain = match algorithm {
        DH_DSS | DH_RSA => generate_dh(&dh_group()).unwrap().chain().clone(),
        ECDH_ECDSA | ECDH_RSA => generate_ecdh(NamedGroup::Secp256r1).unwrap().chain().clone(),
        ECDHE_ECDSA => generate_ecdsa(NamedGroup::Secp256r1).unwrap().chain().clone(),
        DHE_DSS | SRP_DSS => CertificateChain::new(vec![Arc::new(DsaCertificate)]),
        RSA | RSA_PSK | DHE_RSA | ECDHE_RSA | SRP_RSA => rsa_key().chain().clone(),
        DH_anon | ECDH_anon | PSK | DHE_PSK | ECDHE_PSK | SRP => return None,
    };
    Some(chain)
}

/// A server with everything any algorithm could ask of it.
fn complete_server(algorithm: KeyExchangeAlgorithm) -> KeyExchange {
    let config = config();
    let group = srp_group();
    let verifier = config
        .crypto_provider()
        .srp_provider
        .compute_verifier(&group, b"salt", b"user", b"password")
        .unwrap();
    KeyExchange::new_server(
        algorithm,
        ServerKxConfig::new(&config)
            .with_dh_group(dh_group())
            .with_psk_manager(Arc::new(OneKey))
            .with_srp_login(SrpLoginParameters {
                group,
                salt: b"salt".to_vec(),
                verifier,
            }),
    )
}

#[derive(Debug)]
struct OneKey;

impl PskIdentityManager for OneKey {
    fn hint(&self) -> Option<Vec<u8>> {
        None
    }

    fn get_psk(&self, _identity: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
        Some(Zeroizing::new(vec![0x5A; 16]))
    }
}

/// DSA is not implemented, this certificate only claims the role.
#[derive(Debug)]
struct DsaCertificate;

#[derive(Debug)]
struct RejectAll;

impl SignatureVerifier for RejectAll {
    fn verify(
        &self,
        _algorithm: SignatureAndHashAlgorithm,
        _data: &[u8],
        _signature: &[u8],
    ) -> Result<(), String> {
        Err("DSA is not supported".into())
    }
}

impl TlsCertificate for DsaCertificate {
    fn encoded(&self) -> &[u8] {
        &[0x30, 0x00]
    }

    fn supports_role(&self, role: CertificateRole) -> bool {
        role == CertificateRole::Signing(SignatureAlgorithm::Dsa)
    }

    fn create_verifier(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<Box<dyn SignatureVerifier>, String> {
        match algorithm {
            SignatureAlgorithm::Dsa => Ok(Box::new(RejectAll)),
            other => Err(format!("no {:?} key", other)),
        }
    }

    fn create_encryptor(&self) -> Result<Box<dyn Encryptor>, String> {
        Err("not an RSA key".into())
    }

    fn agreement_domain(&self) -> Option<AgreementDomain> {
        None
    }

    fn agreement_public_key(&self) -> Option<&[u8]> {
        None
    }
}

#[test]
fn missing_server_key_exchange_is_unexpected_message() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::ECDHE_ECDSA);
    client.init(context(ProtocolVersion::DTLS1_2)).unwrap();
    let credentials: Credentials = generate_ecdsa(NamedGroup::Secp256r1).unwrap();
    client.process_server_certificate(credentials.chain()).unwrap();

    let err = client.skip_server_key_exchange().unwrap_err();
    assert_eq!(err.alert(), AlertDescription::UnexpectedMessage);
}

#[test]
fn trailing_bytes_in_client_key_exchange() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::ECDH_anon);
    let mut server = server(KeyExchangeAlgorithm::ECDH_anon);
    let ctx = context(ProtocolVersion::DTLS1_2);

    client.init(ctx.clone()).unwrap();
    server.init(ctx).unwrap();
    server.skip_server_credentials().unwrap();
    client.skip_server_credentials().unwrap();
    let ske = server.generate_server_key_exchange().unwrap().unwrap();
    client.process_server_key_exchange(&ske).unwrap();
    client.skip_client_credentials().unwrap();
    server.skip_client_credentials().unwrap();

    let mut cke = client.generate_client_key_exchange().unwrap();
    cke.push(0);
    let err = server.process_client_key_exchange(&cke).unwrap_err();
    assert_eq!(err.alert(), AlertDescription::DecodeError);

    // the failed exchange stays failed
    let err = server.generate_pre_master_secret().unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn trailing_bytes_in_server_key_exchange() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::ECDH_anon);
    let mut server = server(KeyExchangeAlgorithm::ECDH_anon);

    let err = run_with_trailer(&mut client, &mut server).unwrap_err();
    assert_eq!(err.alert(), AlertDescription::DecodeError);
}

fn run_with_trailer(client: &mut KeyExchange, server: &mut KeyExchange) -> Result<(), dtlskx::Error> {
    run_with(
        client,
        server,
        context(ProtocolVersion::DTLS1_2),
        None,
        None,
        |mut ske| {
            ske.extend_from_slice(&[1, 2, 3]);
            ske
        },
    )
    .map(|_| ())
}
