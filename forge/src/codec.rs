use std::{convert::TryInto, fmt, fmt::Debug};

use serde::{Deserialize, Serialize};

/// Returned when a [`Reader`] does not hold enough bytes for the requested field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeError {
    /// Absolute offset in the input at which the read started
    pub offset: usize,
    pub needed: usize,
    pub left: usize,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "needed {} bytes at offset {} but only {} are left",
            self.needed, self.offset, self.left
        )
    }
}

impl std::error::Error for DecodeError {}

/// Read from a byte slice. The cursor only ever moves forward.
///
/// Unlike a reader over a sub-slice, the cursor is an absolute position in the whole input. This
/// is what handshake parsers hand to each other as "pointer".
pub struct Reader<'a> {
    buf: &'a [u8],
    offs: usize,
}

impl<'a> Reader<'a> {
    pub fn init(bytes: &'a [u8]) -> Reader<'a> {
        Reader { buf: bytes, offs: 0 }
    }

    /// Start reading at `pointer`. A pointer past the end yields a reader with nothing left.
    pub fn init_at(bytes: &'a [u8], pointer: usize) -> Reader<'a> {
        Reader {
            buf: bytes,
            offs: pointer.min(bytes.len()),
        }
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.left() < len {
            return Err(DecodeError {
                offset: self.offs,
                needed: len,
                left: self.left(),
            });
        }

        let current = self.offs;
        self.offs += len;
        Ok(&self.buf[current..current + len])
    }

    pub fn any_left(&self) -> bool {
        self.offs < self.buf.len()
    }

    pub fn left(&self) -> usize {
        self.buf.len() - self.offs
    }

    /// Absolute position of the cursor
    pub fn used(&self) -> usize {
        self.offs
    }

    /// Bytes between `from` and the cursor
    pub fn consumed_since(&self, from: usize) -> &'a [u8] {
        &self.buf[from.min(self.offs)..self.offs]
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [value]: [u8; 1] = self.take(1)?.try_into().map_err(|_| self.short(1))?;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes: [u8; 2] = self.take(2)?.try_into().map_err(|_| self.short(2))?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_u24(&mut self) -> Result<u32, DecodeError> {
        let [a, b, c]: [u8; 3] = self.take(3)?.try_into().map_err(|_| self.short(3))?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    /// Read a big-endian unsigned integer of 1 to 4 bytes
    pub fn read_uint(&mut self, width: usize) -> Result<u32, DecodeError> {
        let bytes = self.take(width.min(4))?;
        Ok(bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
    }

    fn short(&self, needed: usize) -> DecodeError {
        DecodeError {
            offset: self.offs,
            needed,
            left: self.left(),
        }
    }
}

/// Things we can encode and read from a [`Reader`].
pub trait Codec: Debug + Sized {
    /// Encode yourself by appending onto `bytes`.
    fn encode(&self, bytes: &mut Vec<u8>);

    /// Convenience function to get the results of `encode()`.
    fn get_encoding(&self) -> Vec<u8> {
        let mut ret = Vec::new();
        self.encode(&mut ret);
        ret
    }

    /// Decode yourself by fiddling with the `Reader`.
    fn read(r: &mut Reader) -> Result<Self, DecodeError>;

    /// Read one of these from the front of `bytes` and return it.
    fn read_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut rd = Reader::init(bytes);
        Self::read(&mut rd)
    }
}

impl Codec for u8 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.push(*self);
    }

    fn read(r: &mut Reader) -> Result<Self, DecodeError> {
        r.read_u8()
    }
}

impl Codec for u16 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.to_be_bytes());
    }

    fn read(r: &mut Reader) -> Result<Self, DecodeError> {
        r.read_u16()
    }
}

/// Append the low-order `width` bytes of `value` in big-endian order.
///
/// Values which do not fit are truncated, which is what a test wants when it injects an
/// oversized length.
pub fn put_uint(value: u32, width: usize, bytes: &mut Vec<u8>) {
    let be = value.to_be_bytes();
    let width = width.min(be.len());
    bytes.extend_from_slice(&be[be.len() - width..]);
}

/// Encode a sequence of items without any length prefix, as used for fixed-width records whose
/// count or length is a separate field.
pub fn encode_all<T: Codec>(items: &[T]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for item in items {
        item.encode(&mut bytes);
    }
    bytes
}

/// Read fixed-width records until `bytes` is exhausted. A trailing partial record is an error.
pub fn read_all<T: Codec>(bytes: &[u8]) -> Result<Vec<T>, DecodeError> {
    let mut r = Reader::init(bytes);
    let mut ret = Vec::new();
    while r.any_left() {
        ret.push(T::read(&mut r)?);
    }
    Ok(ret)
}
