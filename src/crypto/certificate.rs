//! Certificate capability.
//!
//! Certificates are opaque to the key exchange. Parsing and trust evaluation
//! happen elsewhere, what remains is asking a certificate whether it may be
//! used in a role, and for the public key operations tied to that role.

use std::sync::Arc;

use crate::crypto::group::AgreementDomain;
use crate::crypto::provider::{
    AgreementKey, CryptoSafe, Decryptor, Encryptor, SignatureVerifier, SigningKey,
};
use crate::types::SignatureAlgorithm;

/// What a certificate key is used for in a key exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateRole {
    /// Signing ServerKeyExchange params or CertificateVerify.
    Signing(SignatureAlgorithm),
    /// Receiving an RSA encrypted pre-master secret.
    RsaEncryption,
    /// Static finite field Diffie-Hellman.
    DhAgreement,
    /// Static elliptic curve Diffie-Hellman.
    EcdhAgreement,
}

/// A certificate as seen by the key exchange.
pub trait TlsCertificate: CryptoSafe {
    /// DER bytes as sent on the wire.
    fn encoded(&self) -> &[u8];

    /// Whether the certified key may be used in `role`.
    fn supports_role(&self, role: CertificateRole) -> bool;

    fn create_verifier(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<Box<dyn SignatureVerifier>, String>;

    fn create_encryptor(&self) -> Result<Box<dyn Encryptor>, String>;

    /// Group of a certified agreement key, if it is one.
    fn agreement_domain(&self) -> Option<AgreementDomain>;

    /// Public value of a certified agreement key.
    fn agreement_public_key(&self) -> Option<&[u8]>;
}

/// A certificate chain, end entity first.
#[derive(Debug, Clone, Default)]
pub struct CertificateChain(Vec<Arc<dyn TlsCertificate>>);

impl CertificateChain {
    pub fn new(certificates: Vec<Arc<dyn TlsCertificate>>) -> Self {
        CertificateChain(certificates)
    }

    pub fn empty() -> Self {
        CertificateChain(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn end_entity(&self) -> Option<&Arc<dyn TlsCertificate>> {
        self.0.first()
    }
}

/// A certificate chain together with the private key operations it enables.
#[derive(Debug, Clone)]
pub enum Credentials {
    Signer {
        chain: CertificateChain,
        key: Arc<dyn SigningKey>,
    },
    Decryptor {
        chain: CertificateChain,
        key: Arc<dyn Decryptor>,
    },
    Agreement {
        chain: CertificateChain,
        key: Arc<dyn AgreementKey>,
    },
}

impl Credentials {
    pub fn chain(&self) -> &CertificateChain {
        match self {
            Credentials::Signer { chain, .. } => chain,
            Credentials::Decryptor { chain, .. } => chain,
            Credentials::Agreement { chain, .. } => chain,
        }
    }
}
