//! The [`Deserializable`] trait, the [`Cursor`] it reads from, and the
//! primitive impls.

use std::fmt;

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors that can occur while decoding TL data.
///
/// These are the only two failure modes the wire format has: the input ran
/// out, or a type tag was read that no known constructor matches.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The buffer ended before the value was fully read.
    Truncated,
    /// A constructor id that does not belong to any expected type.
    UnknownType {
        /// The offending 32-bit tag.
        id: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "input ended mid-value"),
            Self::UnknownType { id } => write!(f, "unknown constructor id {id:#010x}"),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for TL decoding.
pub type Result<T> = std::result::Result<T, Error>;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// A position-tracking view over an in-memory byte slice.
///
/// Deliberately not `std::io::Cursor`: the wire format can only fail in the
/// two ways listed on [`Error`], so there is no reason to thread
/// `io::Error` through every decoder.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `buf`.
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read one byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        match self.buf.get(self.pos).copied() {
            Some(b) => {
                self.pos += 1;
                Ok(b)
            }
            None => Err(Error::Truncated),
        }
    }

    /// Fill `out` completely or fail with [`Error::Truncated`].
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let end = self.pos + out.len();
        if end > self.buf.len() {
            return Err(Error::Truncated);
        }
        out.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    /// Consume everything left into `out`, returning how many bytes that was.
    pub fn read_to_end(&mut self, out: &mut Vec<u8>) -> usize {
        let rest = &self.buf[self.pos..];
        out.extend_from_slice(rest);
        self.pos = self.buf.len();
        rest.len()
    }

    /// Peek at the next constructor id without consuming it.
    pub fn peek_id(&self) -> Result<u32> {
        let end = self.pos + 4;
        if end > self.buf.len() {
            return Err(Error::Truncated);
        }
        Ok(u32::from_le_bytes(self.buf[self.pos..end].try_into().unwrap()))
    }
}

/// Shorthand used in decoder signatures.
pub type Buffer<'a, 'b> = &'a mut Cursor<'b>;

// ─── Deserializable ──────────────────────────────────────────────────────────

/// Decode a value from TL binary format.
pub trait Deserializable: Sized {
    /// Read `Self` from `buf`, advancing it past the consumed bytes.
    fn deserialize(buf: Buffer) -> Result<Self>;

    /// Decode directly from a byte slice.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::from_slice(bytes);
        Self::deserialize(&mut cursor)
    }
}

// ─── Primitives ──────────────────────────────────────────────────────────────

impl Deserializable for bool {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x997275b5 => Ok(true),
            0xbc799737 => Ok(false),
            id => Err(Error::UnknownType { id }),
        }
    }
}

impl Deserializable for i32 {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let mut b = [0u8; 4];
        buf.read_exact(&mut b)?;
        Ok(i32::from_le_bytes(b))
    }
}

impl Deserializable for u32 {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let mut b = [0u8; 4];
        buf.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }
}

impl Deserializable for i64 {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let mut b = [0u8; 8];
        buf.read_exact(&mut b)?;
        Ok(i64::from_le_bytes(b))
    }
}

impl Deserializable for f64 {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let mut b = [0u8; 8];
        buf.read_exact(&mut b)?;
        Ok(f64::from_le_bytes(b))
    }
}

impl Deserializable for [u8; 16] {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let mut b = [0u8; 16];
        buf.read_exact(&mut b)?;
        Ok(b)
    }
}

impl Deserializable for [u8; 32] {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let mut b = [0u8; 32];
        buf.read_exact(&mut b)?;
        Ok(b)
    }
}

// ─── Bytes / String ──────────────────────────────────────────────────────────

impl Deserializable for Vec<u8> {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let first = buf.read_byte()?;
        let (len, header_len) = if first != 0xfe {
            (first as usize, 1)
        } else {
            let a = buf.read_byte()? as usize;
            let b = buf.read_byte()? as usize;
            let c = buf.read_byte()? as usize;
            (a | (b << 8) | (c << 16), 4)
        };

        let mut data = vec![0u8; len];
        buf.read_exact(&mut data)?;

        let padding = (4 - (header_len + len) % 4) % 4;
        for _ in 0..padding {
            buf.read_byte()?;
        }

        Ok(data)
    }
}

impl Deserializable for String {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let bytes = Vec::<u8>::deserialize(buf)?;
        // Not strictly a length problem, but the input is unusable either way.
        String::from_utf8(bytes).map_err(|_| Error::Truncated)
    }
}

// ─── Vectors ─────────────────────────────────────────────────────────────────

impl<T: Deserializable> Deserializable for Vec<T> {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x1cb5c415 => {}
            id => return Err(Error::UnknownType { id }),
        }
        let len = i32::deserialize(buf)? as usize;
        (0..len).map(|_| T::deserialize(buf)).collect()
    }
}

impl<T: Deserializable> Deserializable for crate::RawVec<T> {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let len = i32::deserialize(buf)? as usize;
        let items = (0..len).map(|_| T::deserialize(buf)).collect::<Result<_>>()?;
        Ok(crate::RawVec(items))
    }
}

// ─── Blob ────────────────────────────────────────────────────────────────────

impl Deserializable for crate::Blob {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let mut rest = Vec::new();
        buf.read_to_end(&mut rest);
        Ok(crate::Blob(rest))
    }
}
