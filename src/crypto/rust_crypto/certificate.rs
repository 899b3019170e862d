//! Raw public key certificates and credential generation.
//!
//! Chain building and X.509 live outside this crate. These certificates
//! carry a bare public key, which is all the key exchange looks at, and are
//! what tests and simple deployments use.

use std::sync::Arc;

use elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::dh::StaticDhKey;
use super::encryption::{RsaDecryptionKey, RsaEncryptor};
use super::sign::{EcdsaSigningKey, PublicVerifier, RsaSigningKey};
use crate::buffer::Buf;
use crate::crypto::certificate::{CertificateChain, CertificateRole, Credentials, TlsCertificate};
use crate::crypto::group::{AgreementDomain, DhGroup};
use crate::crypto::provider::{AgreementKey, Encryptor, SignatureVerifier};
use crate::types::{NamedGroup, SignatureAlgorithm};
use crate::Error;

#[derive(Debug)]
enum RawPublicKey {
    Signing(PublicVerifier),
    Rsa(RsaPublicKey),
    Agreement(AgreementDomain, Vec<u8>),
}

/// A certificate that is nothing but an encoded public key.
#[derive(Debug)]
pub struct RawKeyCertificate {
    encoded: Vec<u8>,
    key: RawPublicKey,
}

impl RawKeyCertificate {
    fn into_chain(self) -> CertificateChain {
        CertificateChain::new(vec![Arc::new(self)])
    }
}

impl TlsCertificate for RawKeyCertificate {
    fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    fn supports_role(&self, role: CertificateRole) -> bool {
        match (&self.key, role) {
            (RawPublicKey::Signing(v), CertificateRole::Signing(alg)) => v.algorithm() == alg,
            (RawPublicKey::Rsa(_), CertificateRole::Signing(alg)) => alg == SignatureAlgorithm::Rsa,
            (RawPublicKey::Rsa(_), CertificateRole::RsaEncryption) => true,
            (RawPublicKey::Agreement(AgreementDomain::Dh(_), _), CertificateRole::DhAgreement) => {
                true
            }
            (
                RawPublicKey::Agreement(AgreementDomain::Ec(_), _),
                CertificateRole::EcdhAgreement,
            ) => true,
            _ => false,
        }
    }

    fn create_verifier(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<Box<dyn SignatureVerifier>, String> {
        if !self.supports_role(CertificateRole::Signing(algorithm)) {
            return Err(format!("Certificate cannot verify {:?}", algorithm));
        }
        match &self.key {
            RawPublicKey::Signing(v) => Ok(Box::new(v.clone())),
            RawPublicKey::Rsa(key) => Ok(Box::new(PublicVerifier::Rsa(key.clone()))),
            RawPublicKey::Agreement(..) => Err("Agreement key cannot verify".to_string()),
        }
    }

    fn create_encryptor(&self) -> Result<Box<dyn Encryptor>, String> {
        match &self.key {
            RawPublicKey::Rsa(key) => Ok(Box::new(RsaEncryptor(key.clone()))),
            _ => Err("Certificate key is not RSA".to_string()),
        }
    }

    fn agreement_domain(&self) -> Option<AgreementDomain> {
        match &self.key {
            RawPublicKey::Agreement(domain, _) => Some(domain.clone()),
            _ => None,
        }
    }

    fn agreement_public_key(&self) -> Option<&[u8]> {
        match &self.key {
            RawPublicKey::Agreement(_, public) => Some(public),
            _ => None,
        }
    }
}

/// Long-term ECDH key on a NIST curve.
enum StaticEcdhKey {
    P256(p256::SecretKey, AgreementDomain, Vec<u8>),
    P384(p384::SecretKey, AgreementDomain, Vec<u8>),
}

impl std::fmt::Debug for StaticEcdhKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticEcdhKey").field(self.domain()).finish()
    }
}

impl AgreementKey for StaticEcdhKey {
    fn domain(&self) -> &AgreementDomain {
        match self {
            StaticEcdhKey::P256(_, d, _) | StaticEcdhKey::P384(_, d, _) => d,
        }
    }

    fn public_key(&self) -> &[u8] {
        match self {
            StaticEcdhKey::P256(_, _, p) | StaticEcdhKey::P384(_, _, p) => p,
        }
    }

    fn agree(&self, peer_pub: &[u8], out: &mut Buf) -> Result<(), String> {
        out.clear();
        match self {
            StaticEcdhKey::P256(secret, ..) => {
                let peer = p256::PublicKey::from_sec1_bytes(peer_pub)
                    .map_err(|_| "Invalid P-256 public key".to_string())?;
                let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                out.extend_from_slice(shared.raw_secret_bytes().as_slice());
            }
            StaticEcdhKey::P384(secret, ..) => {
                let peer = p384::PublicKey::from_sec1_bytes(peer_pub)
                    .map_err(|_| "Invalid P-384 public key".to_string())?;
                let shared = p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                out.extend_from_slice(shared.raw_secret_bytes().as_slice());
            }
        }
        Ok(())
    }
}

/// Generate ECDSA signing credentials on `group` (P-256 or P-384).
pub fn generate_ecdsa(group: NamedGroup) -> Result<Credentials, Error> {
    let (key, verifier, encoded) = match group {
        NamedGroup::Secp256r1 => {
            let key = p256::ecdsa::SigningKey::random(&mut OsRng);
            let public = p256::ecdsa::VerifyingKey::from(&key);
            let encoded = public.to_encoded_point(false).as_bytes().to_vec();
            (EcdsaSigningKey::P256(key), PublicVerifier::EcdsaP256(public), encoded)
        }
        NamedGroup::Secp384r1 => {
            let key = p384::ecdsa::SigningKey::random(&mut OsRng);
            let public = p384::ecdsa::VerifyingKey::from(&key);
            let encoded = public.to_encoded_point(false).as_bytes().to_vec();
            (EcdsaSigningKey::P384(key), PublicVerifier::EcdsaP384(public), encoded)
        }
        _ => {
            return Err(Error::ConfigError(format!(
                "ECDSA is not available on {:?}",
                group
            )))
        }
    };

    let cert = RawKeyCertificate {
        encoded,
        key: RawPublicKey::Signing(verifier),
    };
    Ok(Credentials::Signer {
        chain: cert.into_chain(),
        key: Arc::new(key),
    })
}

/// An RSA key whose certificate serves both signing and key transport.
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    chain: CertificateChain,
    private: Arc<RsaPrivateKey>,
}

impl RsaKeyPair {
    pub fn generate(bits: usize) -> Result<Self, Error> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| Error::CryptoError(format!("RSA key generation failed: {}", e)))?;
        let public = RsaPublicKey::from(&private);
        let encoded = public
            .to_pkcs1_der()
            .map_err(|e| Error::CryptoError(format!("RSA key encoding failed: {}", e)))?
            .as_bytes()
            .to_vec();

        let cert = RawKeyCertificate {
            encoded,
            key: RawPublicKey::Rsa(public),
        };
        Ok(RsaKeyPair {
            chain: cert.into_chain(),
            private: Arc::new(private),
        })
    }

    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    pub fn signer(&self) -> Credentials {
        Credentials::Signer {
            chain: self.chain.clone(),
            key: Arc::new(RsaSigningKey((*self.private).clone())),
        }
    }

    pub fn decryptor(&self) -> Credentials {
        Credentials::Decryptor {
            chain: self.chain.clone(),
            key: Arc::new(RsaDecryptionKey((*self.private).clone())),
        }
    }
}

/// Generate static ECDH credentials on `group` (P-256 or P-384).
pub fn generate_ecdh(group: NamedGroup) -> Result<Credentials, Error> {
    let domain = AgreementDomain::Ec(group);
    let key = match group {
        NamedGroup::Secp256r1 => {
            let secret = p256::SecretKey::random(&mut OsRng);
            let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
            StaticEcdhKey::P256(secret, domain.clone(), public)
        }
        NamedGroup::Secp384r1 => {
            let secret = p384::SecretKey::random(&mut OsRng);
            let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
            StaticEcdhKey::P384(secret, domain.clone(), public)
        }
        _ => {
            return Err(Error::ConfigError(format!(
                "Static ECDH is not available on {:?}",
                group
            )))
        }
    };

    let cert = RawKeyCertificate {
        encoded: key.public_key().to_vec(),
        key: RawPublicKey::Agreement(domain, key.public_key().to_vec()),
    };
    Ok(Credentials::Agreement {
        chain: cert.into_chain(),
        key: Arc::new(key),
    })
}

/// Generate static DH credentials in `group`.
pub fn generate_dh(group: &DhGroup) -> Result<Credentials, Error> {
    let key = StaticDhKey::generate(group).map_err(Error::CryptoError)?;
    let cert = RawKeyCertificate {
        encoded: key.public_key().to_vec(),
        key: RawPublicKey::Agreement(key.domain().clone(), key.public_key().to_vec()),
    };
    Ok(Credentials::Agreement {
        chain: cert.into_chain(),
        key: Arc::new(key),
    })
}
