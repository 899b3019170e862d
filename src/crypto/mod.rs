//! Crypto capability boundary.
//!
//! The key exchange and cookie verifier only see the traits re-exported here.
//! [`rust_crypto`] is the default implementation.

mod certificate;
mod group;
pub mod provider;
pub mod rust_crypto;

pub use certificate::{CertificateChain, CertificateRole, Credentials, TlsCertificate};
pub use group::{AgreementDomain, DhGroup, SrpGroup};

// Re-export all provider traits and types
// This allows users to do: use dtlskx::crypto::{CryptoProvider, SupportedKxGroup, ...};
pub use provider::{ActiveDhExchange, ActiveKeyExchange, AgreementKey, CryptoProvider, CryptoSafe};
pub use provider::{Decryptor, DhProvider, Encryptor, HashContext, HashProvider, HmacProvider};
pub use provider::{MacContext, SecureRandom, SignatureVerifier, SigningKey};
pub use provider::{SrpClientAgreement, SrpProvider, SrpServerExchange, SupportedKxGroup};

// Re-export shared types for provider trait implementations
pub use crate::types::{HashAlgorithm, NamedGroup, SignatureAlgorithm, SignatureAndHashAlgorithm};
