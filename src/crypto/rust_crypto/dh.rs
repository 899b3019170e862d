//! Finite field Diffie-Hellman using num-bigint.

use num_bigint::{BigUint, RandBigInt};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::buffer::Buf;
use crate::crypto::group::{AgreementDomain, DhGroup};
use crate::crypto::provider::{ActiveDhExchange, AgreementKey, DhProvider};

struct DhKeyPair {
    p: BigUint,
    x: Zeroizing<Vec<u8>>,
    public_key: Vec<u8>,
}

impl DhKeyPair {
    fn generate(group: &DhGroup) -> Result<Self, String> {
        let p = BigUint::from_bytes_be(group.p());
        let g = BigUint::from_bytes_be(group.g());
        let two = BigUint::from(2u32);
        if p <= BigUint::from(3u32) || g < two {
            return Err("Degenerate DH group".to_string());
        }

        // x in [2, p-2]
        let x = OsRng.gen_biguint_range(&two, &(&p - 1u32));
        let y = g.modpow(&x, &p);

        Ok(DhKeyPair {
            x: Zeroizing::new(x.to_bytes_be()),
            public_key: y.to_bytes_be(),
            p,
        })
    }

    fn agree(&self, peer_pub: &[u8], out: &mut Buf) -> Result<(), String> {
        let y = BigUint::from_bytes_be(peer_pub);
        let one = BigUint::from(1u32);
        if y <= one || y >= &self.p - 1u32 {
            return Err("DH public value out of range".to_string());
        }

        let x = BigUint::from_bytes_be(&self.x);
        let shared = y.modpow(&x, &self.p);
        if shared <= one {
            return Err("Degenerate DH shared secret".to_string());
        }

        // RFC 5246 8.1.2: leading zero bytes are stripped
        let bytes = Zeroizing::new(shared.to_bytes_be());
        out.clear();
        out.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Ephemeral DH for one handshake.
struct DhEphemeral(DhKeyPair);

impl std::fmt::Debug for DhEphemeral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhEphemeral")
            .field("bits", &self.0.p.bits())
            .finish_non_exhaustive()
    }
}

impl ActiveDhExchange for DhEphemeral {
    fn pub_key(&self) -> &[u8] {
        &self.0.public_key
    }

    fn complete(self: Box<Self>, peer_pub: &[u8], out: &mut Buf) -> Result<(), String> {
        self.0.agree(peer_pub, out)
    }
}

/// Long-term DH key bound to a certificate.
pub struct StaticDhKey {
    domain: AgreementDomain,
    pair: DhKeyPair,
}

impl StaticDhKey {
    pub(super) fn generate(group: &DhGroup) -> Result<Self, String> {
        Ok(StaticDhKey {
            domain: AgreementDomain::Dh(group.clone()),
            pair: DhKeyPair::generate(group)?,
        })
    }
}

impl std::fmt::Debug for StaticDhKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDhKey")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl AgreementKey for StaticDhKey {
    fn domain(&self) -> &AgreementDomain {
        &self.domain
    }

    fn public_key(&self) -> &[u8] {
        &self.pair.public_key
    }

    fn agree(&self, peer_pub: &[u8], out: &mut Buf) -> Result<(), String> {
        self.pair.agree(peer_pub, out)
    }
}

/// DH provider implementation.
#[derive(Debug)]
pub(super) struct RustCryptoDhProvider;

impl DhProvider for RustCryptoDhProvider {
    fn start_exchange(&self, group: &DhGroup) -> Result<Box<dyn ActiveDhExchange>, String> {
        Ok(Box::new(DhEphemeral(DhKeyPair::generate(group)?)))
    }
}

/// Static instance of the DH provider.
pub(super) static DH_PROVIDER: RustCryptoDhProvider = RustCryptoDhProvider;
