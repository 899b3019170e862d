//! Shared protocol types used across the record layer, the reliability layer
//! and the key-exchange family.

use std::cmp::Ordering;
use std::fmt;

use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::buffer::Buf;

/// Largest valid DTLS record sequence number (48 bits).
pub const MAX_SEQUENCE_NUMBER: u64 = (1 << 48) - 1;

// ============================================================================
// Record Layer
// ============================================================================

/// Record content types (RFC 5246 §6.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Heartbeat,
    Unknown(u8),
}

impl ContentType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            24 => ContentType::Heartbeat,
            _ => ContentType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ContentType::ChangeCipherSpec => 20,
            ContentType::Alert => 21,
            ContentType::Handshake => 22,
            ContentType::ApplicationData => 23,
            ContentType::Heartbeat => 24,
            ContentType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ContentType> {
        let (input, byte) = be_u8(input)?;
        Ok((input, Self::from_u8(byte)))
    }
}

/// Protocol version as carried on the wire.
///
/// DTLS versions count downwards (DTLS 1.0 is `{254, 255}`, DTLS 1.2 is
/// `{254, 253}`), so comparisons go through [`ProtocolVersion::is_equal_or_later`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const TLS1_0: ProtocolVersion = ProtocolVersion { major: 3, minor: 1 };
    pub const TLS1_1: ProtocolVersion = ProtocolVersion { major: 3, minor: 2 };
    pub const TLS1_2: ProtocolVersion = ProtocolVersion { major: 3, minor: 3 };
    pub const DTLS1_0: ProtocolVersion = ProtocolVersion {
        major: 0xFE,
        minor: 0xFF,
    };
    pub const DTLS1_2: ProtocolVersion = ProtocolVersion {
        major: 0xFE,
        minor: 0xFD,
    };

    pub fn from_u16(value: u16) -> Self {
        let [major, minor] = value.to_be_bytes();
        ProtocolVersion { major, minor }
    }

    pub fn as_u16(&self) -> u16 {
        u16::from_be_bytes([self.major, self.minor])
    }

    pub fn is_dtls(&self) -> bool {
        self.major == 0xFE
    }

    pub fn is_tls(&self) -> bool {
        self.major == 3
    }

    /// Whether `self` is the same protocol family as `other` and at least as recent.
    pub fn is_equal_or_later(&self, other: ProtocolVersion) -> bool {
        if self.major != other.major {
            return false;
        }
        if self.is_dtls() {
            self.minor <= other.minor
        } else {
            self.minor >= other.minor
        }
    }

    /// TLS 1.2 / DTLS 1.2 and later carry explicit signature-and-hash
    /// algorithms in DigitallySigned structures.
    pub fn uses_signature_and_hash(&self) -> bool {
        if self.is_dtls() {
            self.is_equal_or_later(ProtocolVersion::DTLS1_2)
        } else {
            self.is_equal_or_later(ProtocolVersion::TLS1_2)
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, value) = be_u16(input)?;
        Ok((input, ProtocolVersion::from_u16(value)))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.put_u16(self.as_u16());
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolVersion::DTLS1_0 => write!(f, "DTLSv1.0"),
            ProtocolVersion::DTLS1_2 => write!(f, "DTLSv1.2"),
            ProtocolVersion::TLS1_0 => write!(f, "TLSv1.0"),
            ProtocolVersion::TLS1_1 => write!(f, "TLSv1.1"),
            ProtocolVersion::TLS1_2 => write!(f, "TLSv1.2"),
            _ => write!(f, "{{{}, {}}}", self.major, self.minor),
        }
    }
}

/// Record sequence: the epoch plus the 48-bit sequence number within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sequence {
    /// The epoch (incremented on key change).
    pub epoch: u16,
    /// The sequence number within the epoch (technically u48).
    pub sequence_number: u64,
}

impl Sequence {
    /// Create a new sequence with the given epoch and sequence number 0.
    pub fn new(epoch: u16) -> Self {
        Self {
            epoch,
            sequence_number: 0,
        }
    }

    /// Whether `n` fits in the 48 bits of the record header.
    pub fn is_valid_number(n: u64) -> bool {
        n <= MAX_SEQUENCE_NUMBER
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[epoch: {}, sequence_number: {}]",
            self.epoch, self.sequence_number,
        )
    }
}

impl Ord for Sequence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then(self.sequence_number.cmp(&other.sequence_number))
    }
}

impl PartialOrd for Sequence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Handshake message types (RFC 5246 §7.4, RFC 6347 §4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    HelloRequest,
    ClientHello,
    ServerHello,
    HelloVerifyRequest,
    NewSessionTicket,
    Certificate,
    ServerKeyExchange,
    CertificateRequest,
    ServerHelloDone,
    CertificateVerify,
    ClientKeyExchange,
    Finished,
    CertificateStatus,
    SupplementalData,
    Unknown(u8),
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl MessageType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => MessageType::HelloRequest,
            1 => MessageType::ClientHello,
            2 => MessageType::ServerHello,
            3 => MessageType::HelloVerifyRequest,
            4 => MessageType::NewSessionTicket,
            11 => MessageType::Certificate,
            12 => MessageType::ServerKeyExchange,
            13 => MessageType::CertificateRequest,
            14 => MessageType::ServerHelloDone,
            15 => MessageType::CertificateVerify,
            16 => MessageType::ClientKeyExchange,
            20 => MessageType::Finished,
            22 => MessageType::CertificateStatus,
            23 => MessageType::SupplementalData,
            _ => MessageType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            MessageType::HelloRequest => 0,
            MessageType::ClientHello => 1,
            MessageType::ServerHello => 2,
            MessageType::HelloVerifyRequest => 3,
            MessageType::NewSessionTicket => 4,
            MessageType::Certificate => 11,
            MessageType::ServerKeyExchange => 12,
            MessageType::CertificateRequest => 13,
            MessageType::ServerHelloDone => 14,
            MessageType::CertificateVerify => 15,
            MessageType::ClientKeyExchange => 16,
            MessageType::Finished => 20,
            MessageType::CertificateStatus => 22,
            MessageType::SupplementalData => 23,
            MessageType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], MessageType> {
        let (input, byte) = be_u8(input)?;
        Ok((input, Self::from_u8(byte)))
    }
}

// ============================================================================
// Key Exchange
// ============================================================================

/// Key exchange algorithm selected by the negotiated cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum KeyExchangeAlgorithm {
    DH_DSS,
    DH_RSA,
    DHE_DSS,
    DHE_RSA,
    DH_anon,
    ECDH_ECDSA,
    ECDH_RSA,
    ECDHE_ECDSA,
    ECDHE_RSA,
    ECDH_anon,
    RSA,
    PSK,
    DHE_PSK,
    ECDHE_PSK,
    RSA_PSK,
    SRP,
    SRP_DSS,
    SRP_RSA,
}

impl KeyExchangeAlgorithm {
    /// Anonymous exchanges never see a certificate from either side.
    pub fn is_anonymous(&self) -> bool {
        matches!(
            self,
            KeyExchangeAlgorithm::DH_anon | KeyExchangeAlgorithm::ECDH_anon
        )
    }

    /// Signature algorithm the server uses to sign its ServerKeyExchange, if any.
    pub fn server_signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        match self {
            KeyExchangeAlgorithm::DHE_DSS | KeyExchangeAlgorithm::SRP_DSS => {
                Some(SignatureAlgorithm::Dsa)
            }
            KeyExchangeAlgorithm::ECDHE_ECDSA => Some(SignatureAlgorithm::Ecdsa),
            KeyExchangeAlgorithm::DHE_RSA
            | KeyExchangeAlgorithm::ECDHE_RSA
            | KeyExchangeAlgorithm::SRP_RSA => Some(SignatureAlgorithm::Rsa),
            _ => None,
        }
    }
}

impl fmt::Display for KeyExchangeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Named groups for (EC)DH (RFC 8422, RFC 7919).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedGroup {
    Secp256r1,
    Secp384r1,
    X25519,
    Unknown(u16),
}

impl NamedGroup {
    pub fn from_u16(value: u16) -> Self {
        match value {
            23 => NamedGroup::Secp256r1,
            24 => NamedGroup::Secp384r1,
            29 => NamedGroup::X25519,
            _ => NamedGroup::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            NamedGroup::Secp256r1 => 23,
            NamedGroup::Secp384r1 => 24,
            NamedGroup::X25519 => 29,
            NamedGroup::Unknown(value) => *value,
        }
    }

    /// Exact encoded length of a public value in this group.
    ///
    /// NIST curves are restricted to the uncompressed point format.
    pub fn encoded_point_len(&self) -> Option<usize> {
        match self {
            NamedGroup::Secp256r1 => Some(65),
            NamedGroup::Secp384r1 => Some(97),
            NamedGroup::X25519 => Some(32),
            NamedGroup::Unknown(_) => None,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], NamedGroup> {
        let (input, value) = be_u16(input)?;
        Ok((input, NamedGroup::from_u16(value)))
    }
}

/// Hash algorithms (RFC 5246 §7.4.1.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5 ‖ SHA-1, what RSA signs before TLS 1.2. Never on the wire.
    Md5Sha1,
    Sha1,
    Sha256,
    Sha384,
    Unknown(u8),
}

impl HashAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            2 => HashAlgorithm::Sha1,
            4 => HashAlgorithm::Sha256,
            5 => HashAlgorithm::Sha384,
            _ => HashAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            HashAlgorithm::Md5Sha1 => 0,
            HashAlgorithm::Sha1 => 2,
            HashAlgorithm::Sha256 => 4,
            HashAlgorithm::Sha384 => 5,
            HashAlgorithm::Unknown(value) => *value,
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5Sha1 => 36,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Unknown(_) => 0,
        }
    }
}

/// Signature algorithms (RFC 5246 §7.4.1.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Anonymous,
    Rsa,
    Dsa,
    Ecdsa,
    Unknown(u8),
}

impl SignatureAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SignatureAlgorithm::Anonymous,
            1 => SignatureAlgorithm::Rsa,
            2 => SignatureAlgorithm::Dsa,
            3 => SignatureAlgorithm::Ecdsa,
            _ => SignatureAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            SignatureAlgorithm::Anonymous => 0,
            SignatureAlgorithm::Rsa => 1,
            SignatureAlgorithm::Dsa => 2,
            SignatureAlgorithm::Ecdsa => 3,
            SignatureAlgorithm::Unknown(value) => *value,
        }
    }
}

/// Pair carried in TLS 1.2 DigitallySigned structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureAndHashAlgorithm {
    pub hash: HashAlgorithm,
    pub signature: SignatureAlgorithm,
}

impl SignatureAndHashAlgorithm {
    pub fn new(hash: HashAlgorithm, signature: SignatureAlgorithm) -> Self {
        Self { hash, signature }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SignatureAndHashAlgorithm> {
        let (input, hash) = be_u8(input)?;
        let (input, signature) = be_u8(input)?;
        Ok((
            input,
            SignatureAndHashAlgorithm {
                hash: HashAlgorithm::from_u8(hash),
                signature: SignatureAlgorithm::from_u8(signature),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.put_u8(self.hash.as_u8());
        output.put_u8(self.signature.as_u8());
    }
}

/// Certificate types a server may request from the client (RFC 5246 §7.4.4, RFC 8422).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCertificateType {
    RsaSign,
    DssSign,
    RsaFixedDh,
    DssFixedDh,
    EcdsaSign,
    RsaFixedEcdh,
    EcdsaFixedEcdh,
}

impl ClientCertificateType {
    pub fn as_u8(&self) -> u8 {
        match self {
            ClientCertificateType::RsaSign => 1,
            ClientCertificateType::DssSign => 2,
            ClientCertificateType::RsaFixedDh => 3,
            ClientCertificateType::DssFixedDh => 4,
            ClientCertificateType::EcdsaSign => 64,
            ClientCertificateType::RsaFixedEcdh => 65,
            ClientCertificateType::EcdsaFixedEcdh => 66,
        }
    }
}
