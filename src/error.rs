use std::fmt;
use std::io;

use thiserror::Error;

/// Severity of an alert (RFC 5246 §7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Fatal,
}

impl AlertLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            AlertLevel::Warning => 1,
            AlertLevel::Fatal => 2,
        }
    }
}

/// Alert descriptions this engine can raise.
///
/// Covers RFC 5246 §7.2 plus the PSK (RFC 4279) addition. Anything else
/// seen on the wire is carried as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDescription {
    CloseNotify,
    UnexpectedMessage,
    BadRecordMac,
    RecordOverflow,
    HandshakeFailure,
    BadCertificate,
    UnsupportedCertificate,
    CertificateUnknown,
    IllegalParameter,
    UnknownCa,
    AccessDenied,
    DecodeError,
    DecryptError,
    ProtocolVersion,
    InsufficientSecurity,
    InternalError,
    UnknownPskIdentity,
    Unknown(u8),
}

impl AlertDescription {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => AlertDescription::CloseNotify,
            10 => AlertDescription::UnexpectedMessage,
            20 => AlertDescription::BadRecordMac,
            22 => AlertDescription::RecordOverflow,
            40 => AlertDescription::HandshakeFailure,
            42 => AlertDescription::BadCertificate,
            43 => AlertDescription::UnsupportedCertificate,
            46 => AlertDescription::CertificateUnknown,
            47 => AlertDescription::IllegalParameter,
            48 => AlertDescription::UnknownCa,
            49 => AlertDescription::AccessDenied,
            50 => AlertDescription::DecodeError,
            51 => AlertDescription::DecryptError,
            70 => AlertDescription::ProtocolVersion,
            71 => AlertDescription::InsufficientSecurity,
            80 => AlertDescription::InternalError,
            115 => AlertDescription::UnknownPskIdentity,
            _ => AlertDescription::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            AlertDescription::CloseNotify => 0,
            AlertDescription::UnexpectedMessage => 10,
            AlertDescription::BadRecordMac => 20,
            AlertDescription::RecordOverflow => 22,
            AlertDescription::HandshakeFailure => 40,
            AlertDescription::BadCertificate => 42,
            AlertDescription::UnsupportedCertificate => 43,
            AlertDescription::CertificateUnknown => 46,
            AlertDescription::IllegalParameter => 47,
            AlertDescription::UnknownCa => 48,
            AlertDescription::AccessDenied => 49,
            AlertDescription::DecodeError => 50,
            AlertDescription::DecryptError => 51,
            AlertDescription::ProtocolVersion => 70,
            AlertDescription::InsufficientSecurity => 71,
            AlertDescription::InternalError => 80,
            AlertDescription::UnknownPskIdentity => 115,
            AlertDescription::Unknown(value) => *value,
        }
    }
}

impl fmt::Display for AlertDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertDescription::CloseNotify => "close_notify",
            AlertDescription::UnexpectedMessage => "unexpected_message",
            AlertDescription::BadRecordMac => "bad_record_mac",
            AlertDescription::RecordOverflow => "record_overflow",
            AlertDescription::HandshakeFailure => "handshake_failure",
            AlertDescription::BadCertificate => "bad_certificate",
            AlertDescription::UnsupportedCertificate => "unsupported_certificate",
            AlertDescription::CertificateUnknown => "certificate_unknown",
            AlertDescription::IllegalParameter => "illegal_parameter",
            AlertDescription::UnknownCa => "unknown_ca",
            AlertDescription::AccessDenied => "access_denied",
            AlertDescription::DecodeError => "decode_error",
            AlertDescription::DecryptError => "decrypt_error",
            AlertDescription::ProtocolVersion => "protocol_version",
            AlertDescription::InsufficientSecurity => "insufficient_security",
            AlertDescription::InternalError => "internal_error",
            AlertDescription::UnknownPskIdentity => "unknown_psk_identity",
            AlertDescription::Unknown(v) => return write!(f, "unknown({})", v),
        };
        f.write_str(name)
    }
}

/// Errors surfaced to the handshake coordinator.
///
/// Every variant maps to the alert that should go on the wire, see
/// [`Error::alert`]. Attacker-reachable discards (replayed records,
/// mismatched fragments, bad cookies) never produce an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal protocol fault caused by the peer.
    #[error("fatal alert {0}: {1}")]
    Fatal(AlertDescription, String),

    /// The API was used out of order or for an operation the negotiated
    /// key exchange does not support.
    #[error("internal error: {0}")]
    Internal(String),

    /// A crypto capability reported a failure.
    #[error("crypto error: {0}")]
    CryptoError(String),

    /// The 48-bit write sequence space of an epoch is used up.
    #[error("sequence number space exhausted in epoch {0}")]
    SequenceExhausted(u16),

    /// Epoch counter would wrap.
    #[error("epoch is not allowed to wrap")]
    WrappedEpoch,

    #[error("timeout: {0}")]
    Timeout(&'static str),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl Error {
    pub(crate) fn fatal(description: AlertDescription, reason: impl Into<String>) -> Self {
        Error::Fatal(description, reason.into())
    }

    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        Error::Internal(reason.into())
    }

    /// The alert description to send to the peer for this error.
    pub fn alert(&self) -> AlertDescription {
        match self {
            Error::Fatal(description, _) => *description,
            Error::ParseError(_) => AlertDescription::DecodeError,
            Error::Internal(_)
            | Error::CryptoError(_)
            | Error::SequenceExhausted(_)
            | Error::WrappedEpoch
            | Error::Timeout(_)
            | Error::Transport(_)
            | Error::ConfigError(_) => AlertDescription::InternalError,
        }
    }

    /// Whether the error was caused by local misuse rather than the peer.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(value: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match value {
            nom::Err::Incomplete(_) => Error::ParseError("incomplete input".to_string()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                Error::ParseError(format!("{:?} with {} bytes left", e.code, e.input.len()))
            }
        }
    }
}
