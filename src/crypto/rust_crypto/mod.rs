//! RustCrypto cryptographic provider implementation for dtlskx.
//!
//! This module provides a pure Rust cryptographic backend using crates from
//! the [RustCrypto](https://github.com/RustCrypto) organization, plus
//! `num-bigint` for the finite field groups.
//!
//! # Usage
//!
//! The provider is used automatically when no other is configured, or can be
//! set explicitly:
//!
//! ```
//! use dtlskx::Config;
//! use dtlskx::crypto::rust_crypto;
//!
//! let config = Config::builder()
//!     .with_crypto_provider(rust_crypto::default_provider())
//!     .build()
//!     .unwrap();
//! ```

mod certificate;
mod dh;
mod encryption;
mod hash;
mod hmac;
mod kx_group;
mod random;
mod sign;
mod srp;

pub use certificate::{generate_dh, generate_ecdh, generate_ecdsa, RawKeyCertificate, RsaKeyPair};

use crate::crypto::provider::CryptoProvider;

/// Get the default RustCrypto-based crypto provider.
///
/// # Supported Key Exchange Groups
///
/// - `x25519`
/// - `secp256r1` (P-256, NIST Curve)
/// - `secp384r1` (P-384, NIST Curve)
///
/// # Finite Field Groups
///
/// Diffie-Hellman and SRP run over caller supplied groups. SRP uses SHA-1
/// as RFC 5054 requires.
///
/// # Supported Signature Algorithms
///
/// - ECDSA with P-256 and P-384
/// - RSA PKCS#1 v1.5 with SHA-256 and SHA-384
///
/// # Supported Hash Algorithms
///
/// - SHA-1
/// - SHA-256
/// - SHA-384
///
/// # Random Number Generation
///
/// Uses `OsRng` from the `rand` crate for cryptographically secure random number generation.
pub fn default_provider() -> CryptoProvider {
    CryptoProvider {
        kx_groups: kx_group::ALL_KX_GROUPS,
        dh_provider: &dh::DH_PROVIDER,
        srp_provider: &srp::SRP_PROVIDER,
        secure_random: &random::SECURE_RANDOM,
        hash_provider: &hash::HASH_PROVIDER,
        hmac_provider: &hmac::HMAC_PROVIDER,
    }
}
