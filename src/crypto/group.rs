//! Group parameters exchanged on the wire.

use std::fmt;

use crate::types::NamedGroup;

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

fn bit_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(top) => bytes.len() * 8 - top.leading_zeros() as usize,
        None => 0,
    }
}

/// Finite field Diffie-Hellman group, prime `p` and generator `g`.
///
/// Values are big-endian unsigned integers without leading zeros.
#[derive(Clone, PartialEq, Eq)]
pub struct DhGroup {
    p: Vec<u8>,
    g: Vec<u8>,
}

impl DhGroup {
    pub fn new(p: &[u8], g: &[u8]) -> Self {
        DhGroup {
            p: strip_leading_zeros(p),
            g: strip_leading_zeros(g),
        }
    }

    pub fn p(&self) -> &[u8] {
        &self.p
    }

    pub fn g(&self) -> &[u8] {
        &self.g
    }

    pub fn prime_bits(&self) -> usize {
        bit_len(&self.p)
    }
}

impl fmt::Debug for DhGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhGroup")
            .field("bits", &self.prime_bits())
            .finish()
    }
}

/// SRP group, safe prime `N` and generator `g` (RFC 5054).
#[derive(Clone, PartialEq, Eq)]
pub struct SrpGroup {
    n: Vec<u8>,
    g: Vec<u8>,
}

impl SrpGroup {
    pub fn new(n: &[u8], g: &[u8]) -> Self {
        SrpGroup {
            n: strip_leading_zeros(n),
            g: strip_leading_zeros(g),
        }
    }

    pub fn n(&self) -> &[u8] {
        &self.n
    }

    pub fn g(&self) -> &[u8] {
        &self.g
    }

    pub fn prime_bits(&self) -> usize {
        bit_len(&self.n)
    }
}

impl fmt::Debug for SrpGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrpGroup")
            .field("bits", &self.prime_bits())
            .finish()
    }
}

/// Group of a long-term agreement key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgreementDomain {
    Ec(NamedGroup),
    Dh(DhGroup),
}
