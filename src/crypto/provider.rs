//! Cryptographic provider traits for pluggable crypto backends.
//!
//! The key-exchange family and the cookie verifier never touch a primitive
//! directly. Everything goes through the traits in this module.
//!
//! # Overview
//!
//! [`CryptoProvider`] holds static references to trait objects, each one a
//! factory for a specific capability:
//!
//! - **Key Exchange Groups** ([`SupportedKxGroup`]): ephemeral ECDH
//! - **Finite Field DH** ([`DhProvider`]): ephemeral Diffie-Hellman over a [`DhGroup`]
//! - **SRP** ([`SrpProvider`]): SRP-6a client and server computations
//! - **Secure Random** ([`SecureRandom`]): cryptographically secure RNG
//! - **Hash Provider** ([`HashProvider`]): factory for hash contexts
//! - **HMAC Provider** ([`HmacProvider`]): one-shot and stateful HMAC-SHA256
//!
//! Long-term keys are not part of the provider. They arrive as
//! [`Credentials`](crate::crypto::Credentials) (private side) and
//! [`TlsCertificate`](crate::crypto::TlsCertificate) (peer side).
//!
//! # Thread Safety
//!
//! All provider traits require `Send + Sync + UnwindSafe + RefUnwindSafe` to ensure
//! safe usage across threads and panic boundaries.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};
use std::sync::OnceLock;

use zeroize::Zeroizing;

use crate::buffer::Buf;
use crate::crypto::group::{AgreementDomain, DhGroup, SrpGroup};
use crate::types::{HashAlgorithm, NamedGroup, SignatureAlgorithm, SignatureAndHashAlgorithm};
use crate::Error;

// ============================================================================
// Marker Trait
// ============================================================================

/// Marker trait for types that are safe to use in crypto provider components.
///
/// This trait combines the common bounds required for crypto provider trait objects:
/// - [`Send`] + [`Sync`]: Thread-safe
/// - [`Debug`]: Support debugging
/// - [`UnwindSafe`] + [`RefUnwindSafe`]: Panic-safe
///
/// This trait is automatically implemented for all types that satisfy these bounds.
pub trait CryptoSafe: Send + Sync + Debug + UnwindSafe + RefUnwindSafe {}

/// Blanket implementation: any type satisfying the bounds implements [`CryptoSafe`].
impl<T: Send + Sync + Debug + UnwindSafe + RefUnwindSafe> CryptoSafe for T {}

// ============================================================================
// Instance Traits (created by factories or carried in credentials)
// ============================================================================

/// Stateful hash context for incremental hashing.
pub trait HashContext: CryptoSafe {
    /// Update the hash with new data.
    fn update(&mut self, data: &[u8]);

    /// Clone the context and finalize it, writing the hash to `out`.
    /// The original context can continue to be updated.
    fn clone_and_finalize(&self, out: &mut Buf);
}

/// Keyed MAC that is fed incrementally and reused.
pub trait MacContext: CryptoSafe {
    fn update(&mut self, data: &[u8]);

    /// Write the MAC of everything fed so far and start over with the same key.
    fn finalize_reset(&mut self, out: &mut Buf);

    /// Discard everything fed so far.
    fn reset(&mut self);

    fn output_len(&self) -> usize;
}

/// Signing key for generating digital signatures.
pub trait SigningKey: CryptoSafe {
    /// Sign `data` hashed with `hash` and write the encoded signature to `out`.
    fn sign(&self, hash: HashAlgorithm, data: &[u8], out: &mut Buf) -> Result<(), String>;

    /// Signature algorithm used by this key.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Default hash algorithm for this key.
    fn hash_algorithm(&self) -> HashAlgorithm;
}

/// Verifies signatures made by the holder of a certificate.
pub trait SignatureVerifier: CryptoSafe {
    fn verify(
        &self,
        algorithm: SignatureAndHashAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), String>;
}

/// Public key encryption to a certificate holder (RSA PKCS#1 v1.5).
pub trait Encryptor: CryptoSafe {
    fn encrypt(&self, plaintext: &[u8], out: &mut Buf) -> Result<(), String>;
}

/// Private key decryption (RSA PKCS#1 v1.5).
pub trait Decryptor: CryptoSafe {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, String>;
}

/// A long-term key agreement key, bound to a certificate.
pub trait AgreementKey: CryptoSafe {
    /// Group the key lives in.
    fn domain(&self) -> &AgreementDomain;

    /// Encoded public value, as carried in the certificate.
    fn public_key(&self) -> &[u8];

    /// Compute the shared secret with a peer public value.
    fn agree(&self, peer_pub: &[u8], out: &mut Buf) -> Result<(), String>;
}

/// Active key exchange instance (ephemeral keypair for one handshake).
pub trait ActiveKeyExchange: CryptoSafe {
    /// Get the public key for this exchange.
    fn pub_key(&self) -> &[u8];

    /// Complete exchange with peer's public key, returning shared secret.
    fn complete(self: Box<Self>, peer_pub: &[u8], out: &mut Buf) -> Result<(), String>;

    /// Get the named group for this exchange.
    fn group(&self) -> NamedGroup;
}

/// Active finite field Diffie-Hellman exchange.
///
/// The shared secret is written without leading zero bytes (RFC 5246 §8.1.2).
pub trait ActiveDhExchange: CryptoSafe {
    fn pub_key(&self) -> &[u8];

    fn complete(self: Box<Self>, peer_pub: &[u8], out: &mut Buf) -> Result<(), String>;
}

/// Server half of an SRP-6a exchange.
pub trait SrpServerExchange: CryptoSafe {
    /// The server public value B.
    fn pub_key(&self) -> &[u8];

    /// Derive the premaster secret S from the client public value A.
    fn complete(self: Box<Self>, client_pub: &[u8], out: &mut Buf) -> Result<(), String>;
}

/// Client result of an SRP-6a exchange.
pub struct SrpClientAgreement {
    /// The client public value A.
    pub public_key: Vec<u8>,
    /// The premaster secret S.
    pub premaster: Zeroizing<Vec<u8>>,
}

// ============================================================================
// Factory Traits (used by CryptoProvider)
// ============================================================================

/// Key exchange group support (factory for ActiveKeyExchange).
pub trait SupportedKxGroup: CryptoSafe {
    /// Named group for this key exchange group.
    fn name(&self) -> NamedGroup;

    /// Start a new key exchange, generating ephemeral keypair.
    /// The provided `buf` will be used to store the public key.
    fn start_exchange(&self, buf: Buf) -> Result<Box<dyn ActiveKeyExchange>, String>;
}

/// Finite field Diffie-Hellman (factory for ActiveDhExchange).
pub trait DhProvider: CryptoSafe {
    fn start_exchange(&self, group: &DhGroup) -> Result<Box<dyn ActiveDhExchange>, String>;
}

/// SRP-6a with SHA-1 as in RFC 5054.
pub trait SrpProvider: CryptoSafe {
    /// Password verifier v = g^x for storing on the server.
    fn compute_verifier(
        &self,
        group: &SrpGroup,
        salt: &[u8],
        identity: &[u8],
        password: &[u8],
    ) -> Result<Vec<u8>, String>;

    /// Run the client side against the server public value B.
    fn client_agree(
        &self,
        group: &SrpGroup,
        salt: &[u8],
        identity: &[u8],
        password: &[u8],
        server_pub: &[u8],
    ) -> Result<SrpClientAgreement, String>;

    /// Start the server side with the stored verifier.
    fn server_start(
        &self,
        group: &SrpGroup,
        verifier: &[u8],
    ) -> Result<Box<dyn SrpServerExchange>, String>;
}

/// Secure random number generator.
pub trait SecureRandom: CryptoSafe {
    /// Fill buffer with cryptographically secure random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), String>;
}

/// Hash provider (factory for HashContext).
pub trait HashProvider: CryptoSafe {
    /// Create a new hash context for the specified algorithm.
    fn create_hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn HashContext>, String>;
}

/// HMAC provider for computing HMAC signatures.
pub trait HmacProvider: CryptoSafe {
    /// Compute HMAC-SHA256(key, data) and return the result.
    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<[u8; 32], String>;

    /// Create a reusable HMAC-SHA256 context bound to `key`.
    fn create_hmac_sha256(&self, key: &[u8]) -> Result<Box<dyn MacContext>, String>;
}

// ============================================================================
// Core Provider Struct
// ============================================================================

/// Cryptographic provider for the key-exchange family and the cookie verifier.
///
/// The provider uses static trait object references (`&'static dyn Trait`),
/// which makes it cheap to clone into every key exchange.
#[derive(Debug, Clone)]
pub struct CryptoProvider {
    /// Supported ECDH groups, in preference order.
    pub kx_groups: &'static [&'static dyn SupportedKxGroup],

    /// Finite field Diffie-Hellman.
    pub dh_provider: &'static dyn DhProvider,

    /// SRP-6a computations.
    pub srp_provider: &'static dyn SrpProvider,

    /// Secure random number generator.
    pub secure_random: &'static dyn SecureRandom,

    /// Hash provider for handshake hashing.
    pub hash_provider: &'static dyn HashProvider,

    /// HMAC provider, used for stateless cookies.
    pub hmac_provider: &'static dyn HmacProvider,
}

/// Static storage for the default crypto provider.
static DEFAULT: OnceLock<CryptoProvider> = OnceLock::new();

impl CryptoProvider {
    /// Install a default crypto provider for the process.
    ///
    /// # Panics
    ///
    /// Panics if called more than once. The default provider can only be set once per process.
    pub fn install_default(provider: CryptoProvider) {
        DEFAULT
            .set(provider)
            .expect("CryptoProvider::install_default() called more than once");
    }

    /// Get the default crypto provider, if one has been installed.
    pub fn get_default() -> Option<&'static CryptoProvider> {
        DEFAULT.get()
    }

    /// Find the ECDH group implementation for `group`.
    pub fn find_kx_group(&self, group: NamedGroup) -> Option<&'static dyn SupportedKxGroup> {
        self.kx_groups.iter().copied().find(|g| g.name() == group)
    }

    /// Whether the provider implements `group`.
    pub fn supports_group(&self, group: NamedGroup) -> bool {
        self.find_kx_group(group).is_some()
    }

    /// Fill a fresh buffer of `len` secure random bytes.
    pub fn random_bytes(&self, len: usize) -> Result<Zeroizing<Vec<u8>>, Error> {
        let mut out = Zeroizing::new(vec![0u8; len]);
        self.secure_random
            .fill(&mut out)
            .map_err(Error::CryptoError)?;
        Ok(out)
    }

    /// Check the provider offers what the engine cannot work without.
    pub fn validate(&self) -> Result<(), Error> {
        if self.kx_groups.is_empty() {
            return Err(Error::ConfigError(
                "crypto provider has no key exchange groups".to_string(),
            ));
        }
        for group in self.kx_groups {
            if group.name().encoded_point_len().is_none() {
                return Err(Error::ConfigError(format!(
                    "crypto provider offers unsupported group {:?}",
                    group.name()
                )));
            }
        }
        self.hash_provider
            .create_hash(HashAlgorithm::Sha256)
            .map_err(|e| Error::ConfigError(format!("crypto provider lacks SHA-256: {}", e)))?;
        Ok(())
    }
}
