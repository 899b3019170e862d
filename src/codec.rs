//! nom readers for the length-prefixed and odd-width integers used on the wire.

use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u24, be_u8};
use nom::IResult;

/// Read a 48-bit big-endian integer.
pub fn be_u48(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, bytes) = take(6_usize)(input)?;
    let mut value = [0u8; 8];
    value[2..].copy_from_slice(bytes);
    Ok((input, u64::from_be_bytes(value)))
}

/// Read a vector prefixed by a one byte length.
pub fn opaque8(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u8(input)?;
    take(len as usize)(input)
}

/// Read a vector prefixed by a two byte length.
pub fn opaque16(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u16(input)?;
    take(len as usize)(input)
}

/// Read a vector prefixed by a three byte length.
pub fn opaque24(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u24(input)?;
    take(len as usize)(input)
}
