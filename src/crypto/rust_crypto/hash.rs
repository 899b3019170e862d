//! Hash implementations using RustCrypto.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384};

use crate::buffer::Buf;
use crate::crypto::provider::{HashContext, HashProvider};
use crate::types::HashAlgorithm;

/// Hash context implementation using RustCrypto.
enum RustCryptoHashContext {
    Md5Sha1(Md5, Sha1),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
}

impl std::fmt::Debug for RustCryptoHashContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RustCryptoHashContext::Md5Sha1(..) => "Md5Sha1",
            RustCryptoHashContext::Sha1(_) => "Sha1",
            RustCryptoHashContext::Sha256(_) => "Sha256",
            RustCryptoHashContext::Sha384(_) => "Sha384",
        };
        f.debug_tuple("RustCryptoHashContext").field(&name).finish()
    }
}

impl HashContext for RustCryptoHashContext {
    fn update(&mut self, data: &[u8]) {
        match self {
            RustCryptoHashContext::Md5Sha1(md5, sha1) => {
                md5.update(data);
                sha1.update(data);
            }
            RustCryptoHashContext::Sha1(ctx) => ctx.update(data),
            RustCryptoHashContext::Sha256(ctx) => ctx.update(data),
            RustCryptoHashContext::Sha384(ctx) => ctx.update(data),
        }
    }

    fn clone_and_finalize(&self, out: &mut Buf) {
        out.clear();
        match self {
            RustCryptoHashContext::Md5Sha1(md5, sha1) => {
                out.extend_from_slice(&md5.clone().finalize());
                out.extend_from_slice(&sha1.clone().finalize());
            }
            RustCryptoHashContext::Sha1(ctx) => out.extend_from_slice(&ctx.clone().finalize()),
            RustCryptoHashContext::Sha256(ctx) => out.extend_from_slice(&ctx.clone().finalize()),
            RustCryptoHashContext::Sha384(ctx) => out.extend_from_slice(&ctx.clone().finalize()),
        }
    }
}

/// One-shot digest of `data`.
pub(super) fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, String> {
    match algorithm {
        HashAlgorithm::Md5Sha1 => {
            let mut out = Md5::digest(data).to_vec();
            out.extend_from_slice(&Sha1::digest(data));
            Ok(out)
        }
        HashAlgorithm::Sha1 => Ok(Sha1::digest(data).to_vec()),
        HashAlgorithm::Sha256 => Ok(Sha256::digest(data).to_vec()),
        HashAlgorithm::Sha384 => Ok(Sha384::digest(data).to_vec()),
        _ => Err(format!("Unsupported hash algorithm: {:?}", algorithm)),
    }
}

/// Hash provider implementation.
#[derive(Debug)]
pub(super) struct RustCryptoHashProvider;

impl HashProvider for RustCryptoHashProvider {
    fn create_hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn HashContext>, String> {
        match algorithm {
            HashAlgorithm::Md5Sha1 => Ok(Box::new(RustCryptoHashContext::Md5Sha1(
                Md5::new(),
                Sha1::new(),
            ))),
            HashAlgorithm::Sha1 => Ok(Box::new(RustCryptoHashContext::Sha1(Sha1::new()))),
            HashAlgorithm::Sha256 => Ok(Box::new(RustCryptoHashContext::Sha256(Sha256::new()))),
            HashAlgorithm::Sha384 => Ok(Box::new(RustCryptoHashContext::Sha384(Sha384::new()))),
            _ => Err(format!("Unsupported hash algorithm: {:?}", algorithm)),
        }
    }
}

/// Static instance of the hash provider.
pub(super) static HASH_PROVIDER: RustCryptoHashProvider = RustCryptoHashProvider;
