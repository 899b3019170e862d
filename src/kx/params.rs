//! ServerKeyExchange parameter encodings and their validation.

use nom::number::complete::be_u8;
use nom::IResult;
use num_bigint::BigUint;

use crate::buffer::Buf;
use crate::codec::{opaque16, opaque8};
use crate::crypto::{CryptoSafe, DhGroup, SignatureVerifier, SigningKey, SrpGroup};
use crate::error::AlertDescription;
use crate::kx::KxContext;
use crate::types::{HashAlgorithm, NamedGroup, SignatureAlgorithm, SignatureAndHashAlgorithm};
use crate::Error;

/// ECCurveType.named_curve, the only curve type accepted.
pub const NAMED_CURVE: u8 = 3;

/// Hash implied by a signature before TLS 1.2 / DTLS 1.2 (RFC 4346 §7.4.3, RFC 4492 §5.4).
pub fn legacy_signature_hash(signature: SignatureAlgorithm) -> HashAlgorithm {
    match signature {
        SignatureAlgorithm::Rsa => HashAlgorithm::Md5Sha1,
        _ => HashAlgorithm::Sha1,
    }
}

/// ServerDHParams: opaque16 p, g, Ys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDhParams {
    pub group: DhGroup,
    pub public: Vec<u8>,
}

impl ServerDhParams {
    pub fn parse(input: &[u8]) -> IResult<&[u8], ServerDhParams> {
        let (input, p) = opaque16(input)?;
        let (input, g) = opaque16(input)?;
        let (input, public) = opaque16(input)?;
        Ok((
            input,
            ServerDhParams {
                group: DhGroup::new(p, g),
                public: public.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        output.put_opaque16(self.group.p())?;
        output.put_opaque16(self.group.g())?;
        output.put_opaque16(&self.public)
    }
}

/// ServerECDHParams for a named curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEcdhParams {
    pub group: NamedGroup,
    pub public: Vec<u8>,
}

impl ServerEcdhParams {
    /// Parse, rejecting explicit curve types.
    pub fn parse(input: &[u8]) -> Result<(&[u8], ServerEcdhParams), Error> {
        let (rest, curve_type) = be_u8(input)?;
        if curve_type != NAMED_CURVE {
            return Err(Error::fatal(
                AlertDescription::HandshakeFailure,
                format!("unsupported ECCurveType {}", curve_type),
            ));
        }
        let (rest, group) = NamedGroup::parse(rest)?;
        let (rest, public) = opaque8(rest)?;
        Ok((
            rest,
            ServerEcdhParams {
                group,
                public: public.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        output.put_u8(NAMED_CURVE);
        output.put_u16(self.group.as_u16());
        output.put_opaque8(&self.public)
    }
}

/// ServerSRPParams: opaque16 N, g, opaque8 s, opaque16 B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSrpParams {
    pub group: SrpGroup,
    pub salt: Vec<u8>,
    pub public: Vec<u8>,
}

impl ServerSrpParams {
    pub fn parse(input: &[u8]) -> IResult<&[u8], ServerSrpParams> {
        let (input, n) = opaque16(input)?;
        let (input, g) = opaque16(input)?;
        let (input, salt) = opaque8(input)?;
        let (input, public) = opaque16(input)?;
        Ok((
            input,
            ServerSrpParams {
                group: SrpGroup::new(n, g),
                salt: salt.to_vec(),
                public: public.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        output.put_opaque16(self.group.n())?;
        output.put_opaque16(self.group.g())?;
        output.put_opaque8(&self.salt)?;
        output.put_opaque16(&self.public)
    }
}

/// A signature, with its algorithm when the version carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitallySigned {
    pub algorithm: Option<SignatureAndHashAlgorithm>,
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    pub fn parse(input: &[u8], with_algorithm: bool) -> IResult<&[u8], DigitallySigned> {
        let (input, algorithm) = if with_algorithm {
            let (input, algorithm) = SignatureAndHashAlgorithm::parse(input)?;
            (input, Some(algorithm))
        } else {
            (input, None)
        };
        let (input, signature) = opaque16(input)?;
        Ok((
            input,
            DigitallySigned {
                algorithm,
                signature: signature.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        if let Some(algorithm) = &self.algorithm {
            algorithm.serialize(output);
        }
        output.put_opaque16(&self.signature)
    }
}

/// Sign `params` for the ServerKeyExchange and append the signature to `output`.
pub fn sign_params(
    context: &KxContext,
    key: &dyn SigningKey,
    params: &[u8],
    output: &mut Buf,
) -> Result<(), Error> {
    let with_algorithm = context.version.uses_signature_and_hash();
    let hash = if with_algorithm {
        key.hash_algorithm()
    } else {
        legacy_signature_hash(key.algorithm())
    };

    let mut signature = Buf::new();
    key.sign(hash, &context.signed_data(params), &mut signature)
        .map_err(Error::CryptoError)?;

    DigitallySigned {
        algorithm: with_algorithm.then(|| SignatureAndHashAlgorithm::new(hash, key.algorithm())),
        signature: signature.into_vec(),
    }
    .serialize(output)
}

/// Parse the signature that follows `params` and check it.
///
/// Returns what is left after the signature.
pub fn verify_params<'a>(
    context: &KxContext,
    verifier: &dyn SignatureVerifier,
    expected: SignatureAlgorithm,
    params: &[u8],
    input: &'a [u8],
) -> Result<&'a [u8], Error> {
    let with_algorithm = context.version.uses_signature_and_hash();
    let (rest, signed) = DigitallySigned::parse(input, with_algorithm)?;

    let algorithm = match signed.algorithm {
        Some(algorithm) if algorithm.signature != expected => {
            return Err(Error::fatal(
                AlertDescription::IllegalParameter,
                format!("signature {:?} where {:?} expected", algorithm.signature, expected),
            ));
        }
        Some(algorithm) => algorithm,
        None => SignatureAndHashAlgorithm::new(legacy_signature_hash(expected), expected),
    };

    verifier
        .verify(algorithm, &context.signed_data(params), &signed.signature)
        .map_err(|e| Error::fatal(AlertDescription::DecryptError, e))?;

    Ok(rest)
}

/// Fail with decode_error unless the whole message was consumed.
pub fn expect_end(rest: &[u8], what: &str) -> Result<(), Error> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::fatal(
            AlertDescription::DecodeError,
            format!("{} trailing bytes after {}", rest.len(), what),
        ))
    }
}

/// Decides whether a server chosen DH group is acceptable to the client.
pub trait DhGroupVerifier: CryptoSafe {
    fn accept(&self, group: &DhGroup) -> bool;
}

/// Accepts odd primes of at least `min_bits` with a generator in 2..p-1.
#[derive(Debug, Clone, Copy)]
pub struct DefaultDhGroupVerifier {
    pub min_bits: usize,
}

impl DhGroupVerifier for DefaultDhGroupVerifier {
    fn accept(&self, group: &DhGroup) -> bool {
        if group.prime_bits() < self.min_bits {
            return false;
        }
        let p = BigUint::from_bytes_be(group.p());
        let g = BigUint::from_bytes_be(group.g());
        p.bit(0) && g > BigUint::from(1u32) && g < p - 1u32
    }
}

/// Decides whether a server chosen SRP group is acceptable to the client.
pub trait SrpConfigVerifier: CryptoSafe {
    fn accept(&self, group: &SrpGroup) -> bool;
}

/// Accepts groups of at least `min_bits` with a generator above 1.
#[derive(Debug, Clone, Copy)]
pub struct DefaultSrpConfigVerifier {
    pub min_bits: usize,
}

impl SrpConfigVerifier for DefaultSrpConfigVerifier {
    fn accept(&self, group: &SrpGroup) -> bool {
        let n = BigUint::from_bytes_be(group.n());
        let g = BigUint::from_bytes_be(group.g());
        group.prime_bits() >= self.min_bits && n.bit(0) && g > BigUint::from(1u32) && g < n
    }
}

/// Require 1 < y < p-1 for a peer DH public value.
pub fn check_dh_public(group: &DhGroup, public: &[u8]) -> Result<(), Error> {
    let p = BigUint::from_bytes_be(group.p());
    let y = BigUint::from_bytes_be(public);
    if y <= BigUint::from(1u32) || y >= p - 1u32 {
        return Err(Error::fatal(
            AlertDescription::IllegalParameter,
            "DH public value out of range",
        ));
    }
    Ok(())
}

/// Require a well formed uncompressed point (or X25519 value) for `group`.
pub fn check_ec_point(group: NamedGroup, point: &[u8]) -> Result<(), Error> {
    let Some(len) = group.encoded_point_len() else {
        return Err(Error::fatal(
            AlertDescription::IllegalParameter,
            format!("unsupported group {:?}", group),
        ));
    };
    let prefix_ok = match group {
        NamedGroup::X25519 => true,
        _ => point.first() == Some(&0x04),
    };
    if point.len() != len || !prefix_ok {
        return Err(Error::fatal(
            AlertDescription::IllegalParameter,
            format!("malformed {:?} point of {} bytes", group, point.len()),
        ));
    }
    Ok(())
}
