//! Growable byte buffer with big-endian wire writers.
//!
//! [`Buf`] wraps `Vec<u8>` and is what every serializer in this crate writes
//! into. The writers mirror the readers in [`crate::codec`].

use std::fmt;
use std::ops::{Deref, DerefMut};

use zeroize::Zeroize;

use crate::Error;

/// Growable buffer used for all outbound wire data.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Buf(Vec<u8>);

impl Buf {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Buf(Vec::with_capacity(capacity))
    }

    /// Create a new buffer from a slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Buf(data.to_vec())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.0.extend_from_slice(other);
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn put_u8(&mut self, value: u8) {
        self.0.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    /// Write the low 24 bits of `value`.
    pub fn put_u24(&mut self, value: u32) {
        debug_assert!(value < (1 << 24));
        self.0.extend_from_slice(&value.to_be_bytes()[1..]);
    }

    /// Write the low 48 bits of `value`.
    pub fn put_u48(&mut self, value: u64) {
        debug_assert!(value < (1 << 48));
        self.0.extend_from_slice(&value.to_be_bytes()[2..]);
    }

    /// Write `data` prefixed by a one byte length.
    pub fn put_opaque8(&mut self, data: &[u8]) -> Result<(), Error> {
        let len = u8::try_from(data.len())
            .map_err(|_| Error::internal(format!("opaque8 overflow: {} bytes", data.len())))?;
        self.put_u8(len);
        self.extend_from_slice(data);
        Ok(())
    }

    /// Write `data` prefixed by a two byte length.
    pub fn put_opaque16(&mut self, data: &[u8]) -> Result<(), Error> {
        let len = u16::try_from(data.len())
            .map_err(|_| Error::internal(format!("opaque16 overflow: {} bytes", data.len())))?;
        self.put_u16(len);
        self.extend_from_slice(data);
        Ok(())
    }

    /// Convert the buffer into the underlying `Vec<u8>`.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

impl Zeroize for Buf {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Deref for Buf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Buf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for Buf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Buf {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<Vec<u8>> for Buf {
    fn from(value: Vec<u8>) -> Self {
        Buf(value)
    }
}

impl fmt::Debug for Buf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buf").field("len", &self.0.len()).finish()
    }
}
