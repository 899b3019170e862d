//! Signing and verification using RustCrypto.

use p256::ecdsa::{Signature as P256Signature, SigningKey as P256SigningKey};
use p256::ecdsa::VerifyingKey as P256VerifyingKey;
use p384::ecdsa::{Signature as P384Signature, SigningKey as P384SigningKey};
use p384::ecdsa::VerifyingKey as P384VerifyingKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384};
use signature::hazmat::{PrehashSigner, PrehashVerifier};

use super::hash::digest;
use crate::buffer::Buf;
use crate::crypto::provider::{SignatureVerifier, SigningKey};
use crate::types::{HashAlgorithm, SignatureAlgorithm, SignatureAndHashAlgorithm};

fn rsa_scheme(hash: HashAlgorithm) -> Result<Pkcs1v15Sign, String> {
    match hash {
        // Bare MD5 ‖ SHA-1, no DigestInfo (RFC 4346 §7.4.3)
        HashAlgorithm::Md5Sha1 => Ok(Pkcs1v15Sign::new_unprefixed()),
        HashAlgorithm::Sha256 => Ok(Pkcs1v15Sign::new::<Sha256>()),
        HashAlgorithm::Sha384 => Ok(Pkcs1v15Sign::new::<Sha384>()),
        _ => Err(format!("Unsupported RSA signature hash: {:?}", hash)),
    }
}

/// Digest of `data` for ECDSA over a field of `field_len` bytes.
///
/// A digest shorter than the field is left padded, which leaves its integer
/// value unchanged. SHA-1 on P-384 needs this.
fn ecdsa_prehash(hash: HashAlgorithm, data: &[u8], field_len: usize) -> Result<Vec<u8>, String> {
    if hash == HashAlgorithm::Md5Sha1 {
        return Err("MD5 ‖ SHA-1 is only used with RSA".to_string());
    }
    let hashed = digest(hash, data)?;
    if hashed.len() >= field_len {
        return Ok(hashed);
    }
    let mut padded = vec![0; field_len - hashed.len()];
    padded.extend_from_slice(&hashed);
    Ok(padded)
}

/// ECDSA signing key implementation.
pub(super) enum EcdsaSigningKey {
    P256(P256SigningKey),
    P384(P384SigningKey),
}

impl std::fmt::Debug for EcdsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EcdsaSigningKey::P256(_) => f.debug_tuple("EcdsaSigningKey::P256").finish(),
            EcdsaSigningKey::P384(_) => f.debug_tuple("EcdsaSigningKey::P384").finish(),
        }
    }
}

impl SigningKey for EcdsaSigningKey {
    fn sign(&self, hash: HashAlgorithm, data: &[u8], out: &mut Buf) -> Result<(), String> {
        out.clear();
        match self {
            EcdsaSigningKey::P256(key) => {
                let prehash = ecdsa_prehash(hash, data, 32)?;
                let signature: P256Signature = key
                    .sign_prehash(&prehash)
                    .map_err(|_| "Signing failed".to_string())?;
                out.extend_from_slice(signature.to_der().as_bytes());
            }
            EcdsaSigningKey::P384(key) => {
                let prehash = ecdsa_prehash(hash, data, 48)?;
                let signature: P384Signature = key
                    .sign_prehash(&prehash)
                    .map_err(|_| "Signing failed".to_string())?;
                out.extend_from_slice(signature.to_der().as_bytes());
            }
        }
        Ok(())
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ecdsa
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            EcdsaSigningKey::P256(_) => HashAlgorithm::Sha256,
            EcdsaSigningKey::P384(_) => HashAlgorithm::Sha384,
        }
    }
}

/// RSA PKCS#1 v1.5 signing key.
pub(super) struct RsaSigningKey(pub(super) RsaPrivateKey);

impl std::fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RsaSigningKey").finish()
    }
}

impl SigningKey for RsaSigningKey {
    fn sign(&self, hash: HashAlgorithm, data: &[u8], out: &mut Buf) -> Result<(), String> {
        let scheme = rsa_scheme(hash)?;
        let hashed = digest(hash, data)?;
        let signature = self
            .0
            .sign(scheme, &hashed)
            .map_err(|e| format!("RSA signing failed: {}", e))?;
        out.clear();
        out.extend_from_slice(&signature);
        Ok(())
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Rsa
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

/// Public half of a signing key.
#[derive(Debug, Clone)]
pub(super) enum PublicVerifier {
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Rsa(RsaPublicKey),
}

impl PublicVerifier {
    pub(super) fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PublicVerifier::EcdsaP256(_) | PublicVerifier::EcdsaP384(_) => {
                SignatureAlgorithm::Ecdsa
            }
            PublicVerifier::Rsa(_) => SignatureAlgorithm::Rsa,
        }
    }
}

impl SignatureVerifier for PublicVerifier {
    fn verify(
        &self,
        algorithm: SignatureAndHashAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), String> {
        if algorithm.signature != self.algorithm() {
            return Err(format!(
                "Signature algorithm {:?} does not match key {:?}",
                algorithm.signature,
                self.algorithm()
            ));
        }

        match self {
            PublicVerifier::EcdsaP256(key) => {
                let hashed = ecdsa_prehash(algorithm.hash, data, 32)?;
                let sig = P256Signature::from_der(signature)
                    .map_err(|_| "Invalid signature format".to_string())?;
                key.verify_prehash(&hashed, &sig)
                    .map_err(|_| "ECDSA signature verification failed".to_string())
            }
            PublicVerifier::EcdsaP384(key) => {
                let hashed = ecdsa_prehash(algorithm.hash, data, 48)?;
                let sig = P384Signature::from_der(signature)
                    .map_err(|_| "Invalid signature format".to_string())?;
                key.verify_prehash(&hashed, &sig)
                    .map_err(|_| "ECDSA signature verification failed".to_string())
            }
            PublicVerifier::Rsa(key) => {
                let hashed = digest(algorithm.hash, data)?;
                key.verify(rsa_scheme(algorithm.hash)?, &hashed, signature)
                    .map_err(|_| "RSA signature verification failed".to_string())
            }
        }
    }
}
