//! Key exchange group implementations using RustCrypto.

use elliptic_curve::sec1::ToEncodedPoint;
use p256::{ecdh::EphemeralSecret, PublicKey as P256PublicKey};
use p384::{ecdh::EphemeralSecret as P384EphemeralSecret, PublicKey as P384PublicKey};
use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret as X25519Secret, PublicKey as X25519PublicKey};

use crate::buffer::Buf;
use crate::crypto::provider::{ActiveKeyExchange, SupportedKxGroup};
use crate::types::NamedGroup;

/// ECDHE key exchange implementation.
enum EcdhKeyExchange {
    P256 {
        secret: EphemeralSecret,
        public_key: Buf,
    },
    P384 {
        secret: P384EphemeralSecret,
        public_key: Buf,
    },
    X25519 {
        secret: X25519Secret,
        public_key: Buf,
    },
}

impl std::fmt::Debug for EcdhKeyExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdhKeyExchange")
            .field("group", &self.group())
            .field("public_key_len", &self.pub_key().len())
            .finish_non_exhaustive()
    }
}

impl EcdhKeyExchange {
    fn new(group: NamedGroup, mut buf: Buf) -> Result<Self, String> {
        buf.clear();
        match group {
            NamedGroup::Secp256r1 => {
                let secret = EphemeralSecret::random(&mut OsRng);
                let point = P256PublicKey::from(&secret).to_encoded_point(false);
                buf.extend_from_slice(point.as_bytes());
                Ok(EcdhKeyExchange::P256 {
                    secret,
                    public_key: buf,
                })
            }
            NamedGroup::Secp384r1 => {
                let secret = P384EphemeralSecret::random(&mut OsRng);
                let point = P384PublicKey::from(&secret).to_encoded_point(false);
                buf.extend_from_slice(point.as_bytes());
                Ok(EcdhKeyExchange::P384 {
                    secret,
                    public_key: buf,
                })
            }
            NamedGroup::X25519 => {
                let secret = X25519Secret::random_from_rng(OsRng);
                buf.extend_from_slice(X25519PublicKey::from(&secret).as_bytes());
                Ok(EcdhKeyExchange::X25519 {
                    secret,
                    public_key: buf,
                })
            }
            _ => Err("Unsupported group".to_string()),
        }
    }
}

/// Decode a 32 byte X25519 public value.
fn x25519_peer(peer_pub: &[u8]) -> Result<X25519PublicKey, String> {
    let bytes: [u8; 32] = peer_pub
        .try_into()
        .map_err(|_| "Invalid X25519 public key".to_string())?;
    Ok(X25519PublicKey::from(bytes))
}

impl ActiveKeyExchange for EcdhKeyExchange {
    fn pub_key(&self) -> &[u8] {
        match self {
            EcdhKeyExchange::P256 { public_key, .. } => public_key,
            EcdhKeyExchange::P384 { public_key, .. } => public_key,
            EcdhKeyExchange::X25519 { public_key, .. } => public_key,
        }
    }

    fn complete(self: Box<Self>, peer_pub: &[u8], out: &mut Buf) -> Result<(), String> {
        out.clear();
        match *self {
            EcdhKeyExchange::P256 { secret, .. } => {
                let peer_key = P256PublicKey::from_sec1_bytes(peer_pub)
                    .map_err(|_| "Invalid P-256 public key".to_string())?;
                let shared_secret = secret.diffie_hellman(&peer_key);
                out.extend_from_slice(shared_secret.raw_secret_bytes().as_slice());
            }
            EcdhKeyExchange::P384 { secret, .. } => {
                let peer_key = P384PublicKey::from_sec1_bytes(peer_pub)
                    .map_err(|_| "Invalid P-384 public key".to_string())?;
                let shared_secret = secret.diffie_hellman(&peer_key);
                out.extend_from_slice(shared_secret.raw_secret_bytes().as_slice());
            }
            EcdhKeyExchange::X25519 { secret, .. } => {
                let shared_secret = secret.diffie_hellman(&x25519_peer(peer_pub)?);
                if !shared_secret.was_contributory() {
                    return Err("X25519 shared secret is all zeros".to_string());
                }
                out.extend_from_slice(shared_secret.as_bytes());
            }
        }
        Ok(())
    }

    fn group(&self) -> NamedGroup {
        match self {
            EcdhKeyExchange::P256 { .. } => NamedGroup::Secp256r1,
            EcdhKeyExchange::P384 { .. } => NamedGroup::Secp384r1,
            EcdhKeyExchange::X25519 { .. } => NamedGroup::X25519,
        }
    }
}

/// P-256 (secp256r1) key exchange group.
#[derive(Debug)]
struct P256;

impl SupportedKxGroup for P256 {
    fn name(&self) -> NamedGroup {
        NamedGroup::Secp256r1
    }

    fn start_exchange(&self, buf: Buf) -> Result<Box<dyn ActiveKeyExchange>, String> {
        Ok(Box::new(EcdhKeyExchange::new(NamedGroup::Secp256r1, buf)?))
    }
}

/// P-384 (secp384r1) key exchange group.
#[derive(Debug)]
struct P384;

impl SupportedKxGroup for P384 {
    fn name(&self) -> NamedGroup {
        NamedGroup::Secp384r1
    }

    fn start_exchange(&self, buf: Buf) -> Result<Box<dyn ActiveKeyExchange>, String> {
        Ok(Box::new(EcdhKeyExchange::new(NamedGroup::Secp384r1, buf)?))
    }
}

/// X25519 key exchange group.
#[derive(Debug)]
struct X25519;

impl SupportedKxGroup for X25519 {
    fn name(&self) -> NamedGroup {
        NamedGroup::X25519
    }

    fn start_exchange(&self, buf: Buf) -> Result<Box<dyn ActiveKeyExchange>, String> {
        Ok(Box::new(EcdhKeyExchange::new(NamedGroup::X25519, buf)?))
    }
}

/// Static instances of supported groups.
static KX_GROUP_P256: P256 = P256;
static KX_GROUP_P384: P384 = P384;
static KX_GROUP_X25519: X25519 = X25519;

/// All supported key exchange groups, in preference order.
pub(super) static ALL_KX_GROUPS: &[&dyn SupportedKxGroup] =
    &[&KX_GROUP_X25519, &KX_GROUP_P256, &KX_GROUP_P384];
