//! DTLS handshake message framing.

use nom::bytes::complete::take;
use nom::error::{Error as NomError, ErrorKind};
use nom::number::complete::{be_u16, be_u24};
use nom::IResult;

use crate::buffer::Buf;
use crate::codec::opaque8;
use crate::types::{MessageType, ProtocolVersion};
use crate::Error;

/// Size of the DTLS handshake header.
pub const HANDSHAKE_HEADER_LEN: usize = 12;

/// Largest value of a 24-bit length field.
const MAX_U24: u32 = (1 << 24) - 1;

/// DTLS handshake header (RFC 6347 §4.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandshakeHeader {
    pub msg_type: MessageType,
    pub length: u32,
    pub message_seq: u16,
    pub fragment_offset: u32,
    pub fragment_length: u32,
}

impl HandshakeHeader {
    pub fn parse(input: &[u8]) -> IResult<&[u8], HandshakeHeader> {
        let (input, msg_type) = MessageType::parse(input)?;
        let (input, length) = be_u24(input)?;
        let (input, message_seq) = be_u16(input)?;
        let (input, fragment_offset) = be_u24(input)?;
        let (input, fragment_length) = be_u24(input)?;

        Ok((
            input,
            HandshakeHeader {
                msg_type,
                length,
                message_seq,
                fragment_offset,
                fragment_length,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.put_u8(self.msg_type.as_u8());
        output.put_u24(self.length);
        output.put_u16(self.message_seq);
        output.put_u24(self.fragment_offset);
        output.put_u24(self.fragment_length);
    }

    /// End offset of the fragment, `None` on overflow.
    pub fn fragment_end(&self) -> Option<u32> {
        self.fragment_offset.checked_add(self.fragment_length)
    }

    /// Whether the fragment carries the whole message.
    pub fn is_complete_message(&self) -> bool {
        self.fragment_offset == 0 && self.fragment_length == self.length
    }
}

/// A handshake header and its fragment bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct HandshakeFragment<'a> {
    pub header: HandshakeHeader,
    pub body: &'a [u8],
}

impl<'a> HandshakeFragment<'a> {
    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], HandshakeFragment<'a>> {
        let (input, header) = HandshakeHeader::parse(input)?;
        let (input, body) = take(header.fragment_length as usize)(input)?;
        Ok((input, HandshakeFragment { header, body }))
    }
}

/// Split a handshake body into fragments of at most `max_fragment` bytes.
///
/// Each returned buffer is a handshake header followed by its fragment,
/// ready to be put in a record. An empty body still yields one empty
/// fragment at offset 0, the peer cannot complete the message otherwise.
pub fn fragment_message(
    msg_type: MessageType,
    message_seq: u16,
    body: &[u8],
    max_fragment: usize,
) -> Result<Vec<Buf>, Error> {
    if body.len() > MAX_U24 as usize {
        return Err(Error::internal(format!(
            "handshake body of {} bytes does not fit 24 bits",
            body.len()
        )));
    }
    if max_fragment == 0 {
        return Err(Error::internal("max fragment size must be non-zero"));
    }

    let total_len = body.len();
    let mut fragments = Vec::with_capacity(total_len / max_fragment + 1);
    let mut offset = 0;

    // At least one fragment must be created even if total_len == 0
    while offset < total_len || (total_len == 0 && offset == 0) {
        let len = (total_len - offset).min(max_fragment);

        let header = HandshakeHeader {
            msg_type,
            length: total_len as u32,
            message_seq,
            fragment_offset: offset as u32,
            fragment_length: len as u32,
        };

        let mut buf = Buf::with_capacity(HANDSHAKE_HEADER_LEN + len);
        header.serialize(&mut buf);
        buf.extend_from_slice(&body[offset..offset + len]);
        fragments.push(buf);

        if total_len == 0 {
            break;
        }
        offset += len;
    }

    Ok(fragments)
}

/// HelloVerifyRequest body (RFC 6347 §4.2.1).
#[derive(Debug, PartialEq, Eq)]
pub struct HelloVerifyRequest {
    pub server_version: ProtocolVersion,
    pub cookie: Vec<u8>,
}

impl HelloVerifyRequest {
    pub fn new(server_version: ProtocolVersion, cookie: Vec<u8>) -> Self {
        HelloVerifyRequest {
            server_version,
            cookie,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], HelloVerifyRequest> {
        let (input, server_version) = ProtocolVersion::parse(input)?;
        let (input, cookie) = opaque8(input)?;

        if cookie.is_empty() {
            return Err(nom::Err::Failure(NomError::new(input, ErrorKind::LengthValue)));
        }

        Ok((
            input,
            HelloVerifyRequest {
                server_version,
                cookie: cookie.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        self.server_version.serialize(output);
        output.put_opaque8(&self.cookie)
    }
}
