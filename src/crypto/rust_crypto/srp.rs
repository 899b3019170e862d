//! SRP-6a with SHA-1 (RFC 5054) using num-bigint.

use num_bigint::{BigUint, RandBigInt};
use rand::rngs::OsRng;
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::buffer::Buf;
use crate::crypto::group::SrpGroup;
use crate::crypto::provider::{SrpClientAgreement, SrpProvider, SrpServerExchange};

struct Params {
    n: BigUint,
    g: BigUint,
    pad_len: usize,
}

impl Params {
    fn new(group: &SrpGroup) -> Result<Self, String> {
        let n = BigUint::from_bytes_be(group.n());
        let g = BigUint::from_bytes_be(group.g());
        if n <= BigUint::from(3u32) || g < BigUint::from(2u32) || g >= n {
            return Err("Degenerate SRP group".to_string());
        }
        Ok(Params {
            pad_len: group.n().len(),
            n,
            g,
        })
    }

    fn pad(&self, v: &BigUint) -> Vec<u8> {
        let bytes = v.to_bytes_be();
        let mut out = vec![0u8; self.pad_len.saturating_sub(bytes.len())];
        out.extend_from_slice(&bytes);
        out
    }

    /// k = H(N | PAD(g))
    fn k(&self) -> BigUint {
        let mut h = Sha1::new();
        h.update(self.n.to_bytes_be());
        h.update(self.pad(&self.g));
        BigUint::from_bytes_be(&h.finalize())
    }

    /// u = H(PAD(A) | PAD(B))
    fn u(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let mut h = Sha1::new();
        h.update(self.pad(a));
        h.update(self.pad(b));
        BigUint::from_bytes_be(&h.finalize())
    }

    fn private_value(&self) -> BigUint {
        OsRng.gen_biguint_range(&BigUint::from(1u32), &self.n)
    }
}

/// x = H(s | H(I | ":" | P))
fn private_key(salt: &[u8], identity: &[u8], password: &[u8]) -> BigUint {
    let mut inner = Sha1::new();
    inner.update(identity);
    inner.update(b":");
    inner.update(password);
    let inner = inner.finalize();

    let mut outer = Sha1::new();
    outer.update(salt);
    outer.update(inner);
    BigUint::from_bytes_be(&outer.finalize())
}

struct ServerExchange {
    params: Params,
    v: BigUint,
    b: Zeroizing<Vec<u8>>,
    b_pub_value: BigUint,
    b_pub: Vec<u8>,
}

impl std::fmt::Debug for ServerExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrpServerExchange")
            .field("bits", &self.params.n.bits())
            .finish_non_exhaustive()
    }
}

impl SrpServerExchange for ServerExchange {
    fn pub_key(&self) -> &[u8] {
        &self.b_pub
    }

    fn complete(self: Box<Self>, client_pub: &[u8], out: &mut Buf) -> Result<(), String> {
        let n = &self.params.n;
        let a_pub = BigUint::from_bytes_be(client_pub) % n;
        if a_pub == BigUint::default() {
            return Err("SRP client value A is zero mod N".to_string());
        }

        let u = self.params.u(&a_pub, &self.b_pub_value);
        let b = BigUint::from_bytes_be(&self.b);
        // S = (A * v^u) ^ b
        let s = (a_pub * self.v.modpow(&u, n) % n).modpow(&b, n);

        let bytes = Zeroizing::new(s.to_bytes_be());
        out.clear();
        out.extend_from_slice(&bytes);
        Ok(())
    }
}

/// SRP provider implementation.
#[derive(Debug)]
pub(super) struct RustCryptoSrpProvider;

impl SrpProvider for RustCryptoSrpProvider {
    fn compute_verifier(
        &self,
        group: &SrpGroup,
        salt: &[u8],
        identity: &[u8],
        password: &[u8],
    ) -> Result<Vec<u8>, String> {
        let params = Params::new(group)?;
        let x = private_key(salt, identity, password);
        Ok(params.g.modpow(&x, &params.n).to_bytes_be())
    }

    fn client_agree(
        &self,
        group: &SrpGroup,
        salt: &[u8],
        identity: &[u8],
        password: &[u8],
        server_pub: &[u8],
    ) -> Result<SrpClientAgreement, String> {
        let params = Params::new(group)?;
        let n = &params.n;

        let b_pub = BigUint::from_bytes_be(server_pub) % n;
        if b_pub == BigUint::default() {
            return Err("SRP server value B is zero mod N".to_string());
        }

        let a = params.private_value();
        let a_pub = params.g.modpow(&a, n);
        let u = params.u(&a_pub, &b_pub);
        let x = private_key(salt, identity, password);
        let k = params.k();

        // S = (B - k * g^x) ^ (a + u * x)
        let kgx = k * params.g.modpow(&x, n) % n;
        let base = (b_pub + n - kgx) % n;
        let s = base.modpow(&(a + u * x), n);

        Ok(SrpClientAgreement {
            public_key: a_pub.to_bytes_be(),
            premaster: Zeroizing::new(s.to_bytes_be()),
        })
    }

    fn server_start(
        &self,
        group: &SrpGroup,
        verifier: &[u8],
    ) -> Result<Box<dyn SrpServerExchange>, String> {
        let params = Params::new(group)?;
        let n = &params.n;
        let v = BigUint::from_bytes_be(verifier);

        let b = params.private_value();
        // B = k * v + g^b
        let b_pub_value = (params.k() * &v + params.g.modpow(&b, n)) % n;

        Ok(Box::new(ServerExchange {
            b_pub: b_pub_value.to_bytes_be(),
            b_pub_value,
            b: Zeroizing::new(b.to_bytes_be()),
            v,
            params,
        }))
    }
}

/// Static instance of the SRP provider.
pub(super) static SRP_PROVIDER: RustCryptoSrpProvider = RustCryptoSrpProvider;
