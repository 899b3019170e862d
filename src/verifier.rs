//! Stateless cookie exchange (RFC 6347 §4.2.1).
//!
//! The server answers an initial ClientHello with a HelloVerifyRequest
//! carrying a cookie bound to the client and to the hello itself, and only
//! commits handshake state once a hello comes back with that cookie.
//!
//! ```text
//! Client                                   Server
//! ClientHello (no cookie)     ------>
//!                             <------      HelloVerifyRequest (cookie)
//! ClientHello (cookie)        ------>      verify_request -> VerifiedRequest
//! ```
//!
//! cookie = HMAC-SHA256(key, client_identifier ‖ ClientHello without cookie)
//!
//! The key is drawn once per verifier, so no per-client state is kept.

use std::ops::{Deref, DerefMut, Range};
use std::sync::{Mutex, MutexGuard};

use nom::bytes::complete::take;
use nom::IResult;
use subtle::ConstantTimeEq;

use crate::buffer::Buf;
use crate::codec::opaque8;
use crate::crypto::MacContext;
use crate::message::{HandshakeFragment, HandshakeHeader, HelloVerifyRequest};
use crate::record::{receive_client_hello_record, DtlsRecord};
use crate::transport::DatagramSender;
use crate::types::{ContentType, MessageType, ProtocolVersion, Sequence};
use crate::{Config, Error};

/// Length of the MAC key.
const COOKIE_KEY_LEN: usize = 32;

/// Length of the cookies issued, one HMAC-SHA256 output.
pub const COOKIE_LEN: usize = 32;

/// Largest cookie a DTLS 1.0 ClientHello may carry.
const DTLS1_0_MAX_COOKIE_LEN: usize = 32;

const MAX_SESSION_ID_LEN: usize = 32;

/// Fields of a ClientHello the verifier looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHelloSummary {
    pub client_version: ProtocolVersion,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cookie: Vec<u8>,
}

/// A ClientHello that presented a valid cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    /// Sequence number of the record carrying the hello.
    pub record_seq: u64,
    /// The complete handshake message, header included.
    pub message: Vec<u8>,
    pub client_hello: ClientHelloSummary,
}

/// Issues and checks stateless cookies.
///
/// Shared between threads fielding datagrams for the same server. Each
/// verification holds one lock over the MAC from first feed to reset.
pub struct CookieVerifier {
    mac: Mutex<Box<dyn MacContext>>,
    max_cookie_length: usize,
}

impl CookieVerifier {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let provider = config.crypto_provider();
        let key = provider.random_bytes(COOKIE_KEY_LEN)?;
        let mac = provider
            .hmac_provider
            .create_hmac_sha256(&key)
            .map_err(Error::CryptoError)?;
        debug!("Cookie verifier created");
        Ok(CookieVerifier {
            mac: Mutex::new(mac),
            max_cookie_length: config.max_cookie_length(),
        })
    }

    /// Check the cookie of an initial ClientHello datagram.
    ///
    /// Returns the request if its cookie is valid. Otherwise a
    /// HelloVerifyRequest with the right cookie is sent through `sender`
    /// (if the datagram was a well formed ClientHello at all) and `None`
    /// is returned.
    pub fn verify_request(
        &self,
        client_id: &[u8],
        datagram: &[u8],
        sender: &mut dyn DatagramSender,
    ) -> Option<VerifiedRequest> {
        let record = receive_client_hello_record(datagram)?;

        let Ok((rest, fragment)) = HandshakeFragment::parse(record.fragment) else {
            warn!("Undecodable handshake message in ClientHello record");
            return None;
        };
        let header = fragment.header;
        if header.msg_type != MessageType::ClientHello
            || !header.is_complete_message()
            || !rest.is_empty()
        {
            warn!(
                "Expected a whole ClientHello, got {:?} offset {} length {}/{}",
                header.msg_type, header.fragment_offset, header.fragment_length, header.length
            );
            return None;
        }

        let max_cookie = if record.version == ProtocolVersion::DTLS1_0 {
            DTLS1_0_MAX_COOKIE_LEN
        } else {
            self.max_cookie_length
        };
        let Some((client_hello, cookie_field)) = parse_client_hello(fragment.body, max_cookie)
        else {
            warn!("Malformed ClientHello body");
            return None;
        };

        let cookie_len = COOKIE_LEN.min(max_cookie);
        let presented = &client_hello.cookie;
        let (valid, expected) =
            self.check_cookie(client_id, fragment.body, cookie_field, cookie_len, presented)?;
        if valid {
            debug!("Cookie accepted for record {}", record.record_seq);
            return Some(VerifiedRequest {
                record_seq: record.record_seq,
                message: record.fragment.to_vec(),
                client_hello,
            });
        }

        if presented.is_empty() {
            debug!("No cookie, sending HelloVerifyRequest");
        } else {
            debug!("Invalid cookie, sending HelloVerifyRequest");
        }
        match hello_verify_request(record.record_seq, &expected) {
            Ok(datagram) => {
                if let Err(e) = sender.send(&datagram) {
                    warn!("Failed to send HelloVerifyRequest: {}", e);
                }
            }
            Err(e) => warn!("Failed to build HelloVerifyRequest: {}", e),
        }
        None
    }

    /// Compare `presented` with the cookie for this hello under one MAC lock.
    ///
    /// Returns whether it matched along with the expected cookie.
    fn check_cookie(
        &self,
        client_id: &[u8],
        body: &[u8],
        cookie_field: Range<usize>,
        len: usize,
        presented: &[u8],
    ) -> Option<(bool, Vec<u8>)> {
        let mut mac = ResetOnDrop(self.mac.lock().unwrap_or_else(|e| e.into_inner()));
        let expected = compute_cookie(&mut **mac, client_id, body, cookie_field, len)?;
        let valid = presented.len() == expected.len() && bool::from(presented.ct_eq(&expected));
        drop(mac);
        Some((valid, expected))
    }
}

fn compute_cookie(
    mac: &mut dyn MacContext,
    client_id: &[u8],
    body: &[u8],
    cookie_field: Range<usize>,
    len: usize,
) -> Option<Vec<u8>> {
    mac.update(client_id);
    mac.update(&body[..cookie_field.start]);
    mac.update(&body[cookie_field.end..]);

    let mut out = Buf::new();
    mac.finalize_reset(&mut out);
    if out.len() < len {
        warn!("Cookie MAC output of {} bytes too short", out.len());
        return None;
    }
    out.truncate(len);
    Some(out.into_vec())
}

impl std::fmt::Debug for CookieVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieVerifier")
            .field("max_cookie_length", &self.max_cookie_length)
            .finish_non_exhaustive()
    }
}

/// Returns the MAC to its keyed initial state however the holder exits.
struct ResetOnDrop<'a>(MutexGuard<'a, Box<dyn MacContext>>);

impl Deref for ResetOnDrop<'_> {
    type Target = Box<dyn MacContext>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ResetOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// Build a complete HelloVerifyRequest datagram.
///
/// Record and server version are DTLS 1.0 as RFC 6347 §4.2.1 recommends,
/// and the record echoes the sequence number of the ClientHello record.
pub fn hello_verify_request(record_seq: u64, cookie: &[u8]) -> Result<Vec<u8>, Error> {
    let mut body = Buf::new();
    HelloVerifyRequest::new(ProtocolVersion::DTLS1_0, cookie.to_vec()).serialize(&mut body)?;

    let length = body.len() as u32;
    let mut message = Buf::new();
    HandshakeHeader {
        msg_type: MessageType::HelloVerifyRequest,
        length,
        message_seq: 0,
        fragment_offset: 0,
        fragment_length: length,
    }
    .serialize(&mut message);
    message.extend_from_slice(&body);

    let mut out = Buf::new();
    DtlsRecord::write(
        ContentType::Handshake,
        ProtocolVersion::DTLS1_0,
        Sequence {
            epoch: 0,
            sequence_number: record_seq,
        },
        &message,
        &mut out,
    );
    Ok(out.into_vec())
}

/// Parse the ClientHello prefix up to and including the cookie.
///
/// Returns the summary and the byte range of the cookie field, its length
/// byte included. Whatever follows the cookie is not interpreted.
fn parse_client_hello(
    body: &[u8],
    max_cookie: usize,
) -> Option<(ClientHelloSummary, Range<usize>)> {
    let (after_session, (client_version, random, session_id)) = hello_prefix(body).ok()?;
    if session_id.len() > MAX_SESSION_ID_LEN {
        return None;
    }
    let (after_cookie, cookie) = opaque8(after_session).ok()?;
    if cookie.len() > max_cookie {
        return None;
    }

    let start = body.len() - after_session.len();
    let end = body.len() - after_cookie.len();
    let mut random_bytes = [0u8; 32];
    random_bytes.copy_from_slice(random);

    Some((
        ClientHelloSummary {
            client_version,
            random: random_bytes,
            session_id: session_id.to_vec(),
            cookie: cookie.to_vec(),
        },
        start..end,
    ))
}

fn hello_prefix(input: &[u8]) -> IResult<&[u8], (ProtocolVersion, &[u8], &[u8])> {
    let (input, client_version) = ProtocolVersion::parse(input)?;
    let (input, random) = take(32_usize)(input)?;
    let (input, session_id) = opaque8(input)?;
    Ok((input, (client_version, random, session_id)))
}
