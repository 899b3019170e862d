use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::codec::be_u48;
use crate::types::{ContentType, ProtocolVersion, Sequence};

/// Size of the DTLS record header.
pub const RECORD_HEADER_LEN: usize = 13;

/// Largest plaintext record body (2^14).
pub const MAX_FRAGMENT_LEN: usize = 1 << 14;

/// DTLS record header (RFC 6347 §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtlsRecordHeader {
    pub content_type: ContentType,
    pub version: ProtocolVersion,
    pub sequence: Sequence,
    pub length: u16,
}

impl DtlsRecordHeader {
    pub fn parse(input: &[u8]) -> IResult<&[u8], DtlsRecordHeader> {
        let (input, content_type) = ContentType::parse(input)?;
        let (input, version) = ProtocolVersion::parse(input)?;
        let (input, epoch) = be_u16(input)?;
        let (input, sequence_number) = be_u48(input)?;
        let (input, length) = be_u16(input)?;

        Ok((
            input,
            DtlsRecordHeader {
                content_type,
                version,
                sequence: Sequence {
                    epoch,
                    sequence_number,
                },
                length,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.put_u8(self.content_type.as_u8());
        self.version.serialize(output);
        output.put_u16(self.sequence.epoch);
        output.put_u48(self.sequence.sequence_number);
        output.put_u16(self.length);
    }
}

/// A record header with its body borrowed from the datagram.
#[derive(Debug, PartialEq, Eq)]
pub struct DtlsRecord<'a> {
    pub header: DtlsRecordHeader,
    pub fragment: &'a [u8],
}

impl<'a> DtlsRecord<'a> {
    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], DtlsRecord<'a>> {
        let (input, header) = DtlsRecordHeader::parse(input)?;
        let (input, fragment) = take(header.length as usize)(input)?;
        Ok((input, DtlsRecord { header, fragment }))
    }

    /// Write a complete record.
    pub fn write(
        content_type: ContentType,
        version: ProtocolVersion,
        sequence: Sequence,
        fragment: &[u8],
        output: &mut Buf,
    ) {
        debug_assert!(fragment.len() <= u16::MAX as usize);
        let header = DtlsRecordHeader {
            content_type,
            version,
            sequence,
            length: fragment.len() as u16,
        };
        header.serialize(output);
        output.extend_from_slice(fragment);
    }
}

/// Handshake fragment of an initial ClientHello record.
#[derive(Debug, PartialEq, Eq)]
pub struct ClientHelloRecord<'a> {
    /// Sequence number of the carrying record, echoed in HelloVerifyRequest.
    pub record_seq: u64,
    pub version: ProtocolVersion,
    pub fragment: &'a [u8],
}

/// Extract the first record of a datagram if it can carry an initial ClientHello.
///
/// It must be a handshake record in epoch 0 with a DTLS version and a body
/// that fits both the datagram and the plaintext limit. Any following
/// records are ignored. Returns `None` for anything else.
pub fn receive_client_hello_record(datagram: &[u8]) -> Option<ClientHelloRecord<'_>> {
    let (_, header) = DtlsRecordHeader::parse(datagram).ok()?;

    if header.content_type != ContentType::Handshake {
        trace!("Not a handshake record: {:?}", header.content_type);
        return None;
    }

    if !header.version.is_dtls() {
        trace!("Not a DTLS record version: {}", header.version);
        return None;
    }

    if header.sequence.epoch != 0 {
        trace!("ClientHello record in epoch {}", header.sequence.epoch);
        return None;
    }

    let length = header.length as usize;
    if length > MAX_FRAGMENT_LEN || RECORD_HEADER_LEN + length > datagram.len() {
        trace!("ClientHello record length {} out of bounds", length);
        return None;
    }

    Some(ClientHelloRecord {
        record_seq: header.sequence.sequence_number,
        version: header.version,
        fragment: &datagram[RECORD_HEADER_LEN..RECORD_HEADER_LEN + length],
    })
}
