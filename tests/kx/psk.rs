//! Pre-shared keys, alone and combined with (EC)DHE or RSA.

use std::sync::Arc;

use zeroize::Zeroizing;

use dtlskx::kx::{ClientKxConfig, KeyExchange, PskIdentity, PskIdentityManager, ServerKxConfig};
use dtlskx::types::{KeyExchangeAlgorithm, ProtocolVersion};
use dtlskx::AlertDescription;

use crate::common::*;

const IDENTITY: &[u8] = b"client-1";
const KEY: [u8; 16] = [0x5A; 16];

#[derive(Debug)]
struct Keys {
    hint: Option<Vec<u8>>,
}

impl PskIdentityManager for Keys {
    fn hint(&self) -> Option<Vec<u8>> {
        self.hint.clone()
    }

    fn get_psk(&self, identity: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
        (identity == IDENTITY).then(|| Zeroizing::new(KEY.to_vec()))
    }
}

fn psk_client(algorithm: KeyExchangeAlgorithm, identity: &[u8]) -> KeyExchange {
    KeyExchange::new_client(
        algorithm,
        ClientKxConfig::new(&config()).with_psk(PskIdentity::new(identity, &KEY)),
    )
}

fn psk_server(algorithm: KeyExchangeAlgorithm, hint: Option<&[u8]>) -> KeyExchange {
    let keys = Keys {
        hint: hint.map(|h| h.to_vec()),
    };
    KeyExchange::new_server(
        algorithm,
        ServerKxConfig::new(&config())
            .with_psk_manager(Arc::new(keys))
            .with_dh_group(dh_group()),
    )
}

#[test]
fn plain_psk_without_hint() {
    let _ = env_logger::try_init();

    let mut client = psk_client(KeyExchangeAlgorithm::PSK, IDENTITY);
    let mut server = psk_server(KeyExchangeAlgorithm::PSK, None);

    let (c, s, transcript) = run(&mut client, &mut server, None, None).unwrap();
    assert_same(&c, &s);
    assert_eq!(transcript.server_key_exchange, None);
    assert_eq!(transcript.certificate_types, None);

    let mut expected = vec![0, 16];
    expected.extend_from_slice(&[0; 16]);
    expected.extend_from_slice(&[0, 16]);
    expected.extend_from_slice(&KEY);
    assert_eq!(c.as_bytes(), &expected[..]);

    let mut cke = vec![0, IDENTITY.len() as u8];
    cke.extend_from_slice(IDENTITY);
    assert_eq!(transcript.client_key_exchange, cke);
}

#[test]
fn plain_psk_with_hint() {
    let _ = env_logger::try_init();

    let mut client = psk_client(KeyExchangeAlgorithm::PSK, IDENTITY);
    let mut server = psk_server(KeyExchangeAlgorithm::PSK, Some(b"hint"));

    let (c, s, transcript) = run(&mut client, &mut server, None, None).unwrap();
    assert_same(&c, &s);
    assert_eq!(
        transcript.server_key_exchange,
        Some(vec![0, 4, b'h', b'i', b'n', b't'])
    );
}

#[test]
fn dhe_psk_agrees() {
    let _ = env_logger::try_init();

    let mut client = psk_client(KeyExchangeAlgorithm::DHE_PSK, IDENTITY);
    let mut server = psk_server(KeyExchangeAlgorithm::DHE_PSK, None);

    let (c, s, transcript) = run(&mut client, &mut server, None, None).unwrap();
    assert_same(&c, &s);

    // empty hint, then ServerDHParams
    let ske = transcript.server_key_exchange.unwrap();
    assert_eq!(&ske[..4], &[0, 0, 0, 8]);

    // the PSK closes the secret
    let bytes = c.as_bytes();
    assert_eq!(&bytes[bytes.len() - 18..bytes.len() - 16], &[0, 16]);
    assert_eq!(&bytes[bytes.len() - 16..], &KEY);
}

#[test]
fn ecdhe_psk_agrees() {
    let _ = env_logger::try_init();

    let mut client = psk_client(KeyExchangeAlgorithm::ECDHE_PSK, IDENTITY);
    let mut server = psk_server(KeyExchangeAlgorithm::ECDHE_PSK, Some(b"h"));

    let (c, s, _) = run(&mut client, &mut server, None, None).unwrap();
    assert_same(&c, &s);
    // opaque16 of a 32 byte shared secret with the default X25519 group
    assert_eq!(&c.as_bytes()[..2], &[0, 32]);
    assert_eq!(c.len(), 2 + 32 + 2 + 16);
}

#[test]
fn rsa_psk_agrees() {
    let _ = env_logger::try_init();

    let mut client = psk_client(KeyExchangeAlgorithm::RSA_PSK, IDENTITY);
    let mut server = psk_server(KeyExchangeAlgorithm::RSA_PSK, None);

    let (c, s, _) = run(&mut client, &mut server, Some(rsa_key().decryptor()), None).unwrap();
    assert_same(&c, &s);
    assert_eq!(&c.as_bytes()[..4], &[0, 48, 0xFE, 0xFD]);
    assert_eq!(c.len(), 2 + 48 + 2 + 16);
}

#[test]
fn unknown_identity() {
    let _ = env_logger::try_init();

    let mut client = psk_client(KeyExchangeAlgorithm::PSK, b"stranger");
    let mut server = psk_server(KeyExchangeAlgorithm::PSK, None);

    let err = run(&mut client, &mut server, None, None).unwrap_err();
    assert_eq!(err.alert(), AlertDescription::UnknownPskIdentity);
}

#[test]
fn client_without_psk_is_internal_error() {
    let _ = env_logger::try_init();

    let mut client = client(KeyExchangeAlgorithm::PSK);
    let mut server = psk_server(KeyExchangeAlgorithm::PSK, None);

    let err = run(&mut client, &mut server, None, None).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn dhe_psk_requires_server_key_exchange() {
    let _ = env_logger::try_init();

    let mut client = psk_client(KeyExchangeAlgorithm::DHE_PSK, IDENTITY);
    client.init(context(ProtocolVersion::DTLS1_2)).unwrap();
    client.skip_server_credentials().unwrap();

    let err = client.skip_server_key_exchange().unwrap_err();
    assert_eq!(err.alert(), AlertDescription::UnexpectedMessage);
}
