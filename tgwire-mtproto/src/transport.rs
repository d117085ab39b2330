//! Sans-io transport framing.
//!
//! Each codec turns payloads into framed bytes and back without touching a
//! socket, so the same code drives a tokio stream, a test buffer, or anything
//! else. `unpack` consumes complete frames from the front of a growable
//! buffer and returns `Ok(None)` while the frame is still incomplete.

/// Errors surfaced by the framing codecs.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportError {
    /// The server answered with a transport-level error code (e.g. -404).
    Rejected(i32),
    /// A Full-framing checksum did not match.
    BadCrc {
        /// CRC computed over the received frame.
        expected: u32,
        /// CRC carried by the frame.
        got: u32,
    },
    /// A length prefix that cannot describe a valid frame.
    BadLength(u32),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(code) => write!(f, "transport rejected: {code}"),
            Self::BadCrc { expected, got } => {
                write!(f, "crc mismatch: expected {expected:#x}, got {got:#x}")
            }
            Self::BadLength(len) => write!(f, "invalid frame length {len}"),
        }
    }
}
impl std::error::Error for TransportError {}

/// Which framing a connection speaks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Framing {
    /// 1-or-4-byte word-count prefix, `0xef` init byte.
    #[default]
    Abridged,
    /// 4-byte LE length prefix, `0xeeeeeeee` init.
    Intermediate,
    /// `len || seqno || payload || crc32`, no init.
    Full,
}

impl Framing {
    /// Instantiate the codec for this framing.
    pub fn codec(self) -> Codec {
        match self {
            Framing::Abridged => Codec::Abridged(Abridged::new()),
            Framing::Intermediate => Codec::Intermediate(Intermediate::new()),
            Framing::Full => Codec::Full(Full::new()),
        }
    }
}

/// A codec instance with its per-connection state.
pub enum Codec {
    /// See [`Abridged`].
    Abridged(Abridged),
    /// See [`Intermediate`].
    Intermediate(Intermediate),
    /// See [`Full`].
    Full(Full),
}

impl Codec {
    /// Append a framed `payload` to `out`, emitting the init marker on the
    /// first call where the framing has one.
    pub fn pack(&mut self, payload: &[u8], out: &mut Vec<u8>) {
        match self {
            Codec::Abridged(c) => c.pack(payload, out),
            Codec::Intermediate(c) => c.pack(payload, out),
            Codec::Full(c) => c.pack(payload, out),
        }
    }

    /// Try to extract one complete payload from the front of `buf`.
    pub fn unpack(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        match self {
            Codec::Abridged(c) => c.unpack(buf),
            Codec::Intermediate(c) => c.unpack(buf),
            Codec::Full(c) => c.unpack(buf),
        }
    }
}

// A 4-byte payload holding a negative number is a transport-level rejection.
fn check_rejection(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    if payload.len() == 4 {
        let code = i32::from_le_bytes(payload.try_into().unwrap());
        if code < 0 {
            return Err(TransportError::Rejected(code));
        }
    }
    Ok(payload.to_vec())
}

// ─── Abridged ────────────────────────────────────────────────────────────────

/// The abridged framing: init byte `0xef`, then each frame is a word count
/// (1 byte below 127, else `0x7f` plus 3 LE bytes) followed by the payload.
pub struct Abridged {
    init_sent: bool,
}

impl Abridged {
    /// Fresh codec, init byte not yet sent.
    pub fn new() -> Self {
        Self { init_sent: false }
    }

    /// Codec for the accepting peer, which never emits the init byte.
    pub fn accepting() -> Self {
        Self { init_sent: true }
    }

    /// Append a framed `payload` to `out`.
    pub fn pack(&mut self, payload: &[u8], out: &mut Vec<u8>) {
        if !self.init_sent {
            out.push(0xef);
            self.init_sent = true;
        }
        let words = payload.len() / 4;
        if words < 127 {
            out.push(words as u8);
        } else {
            out.push(0x7f);
            out.extend_from_slice(&(words as u32).to_le_bytes()[..3]);
        }
        out.extend_from_slice(payload);
    }

    /// Try to extract one complete payload from the front of `buf`.
    pub fn unpack(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        if buf.is_empty() {
            return Ok(None);
        }
        let (words, header) = if buf[0] < 0x7f {
            (buf[0] as usize, 1)
        } else {
            if buf.len() < 4 {
                return Ok(None);
            }
            let words = buf[1] as usize | (buf[2] as usize) << 8 | (buf[3] as usize) << 16;
            (words, 4)
        };
        let len = words * 4;
        if buf.len() < header + len {
            return Ok(None);
        }
        let payload = check_rejection(&buf[header..header + len])?;
        buf.drain(..header + len);
        Ok(Some(payload))
    }
}

impl Default for Abridged {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Intermediate ────────────────────────────────────────────────────────────

/// The intermediate framing: init word `0xeeeeeeee`, then each frame is a
/// 4-byte LE length followed by the payload.
pub struct Intermediate {
    init_sent: bool,
}

impl Intermediate {
    /// Fresh codec, init word not yet sent.
    pub fn new() -> Self {
        Self { init_sent: false }
    }

    /// Codec for the accepting peer, which never emits the init word.
    pub fn accepting() -> Self {
        Self { init_sent: true }
    }

    /// Append a framed `payload` to `out`.
    pub fn pack(&mut self, payload: &[u8], out: &mut Vec<u8>) {
        if !self.init_sent {
            out.extend(0xeeeeeeeeu32.to_le_bytes());
            self.init_sent = true;
        }
        out.extend((payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
    }

    /// Try to extract one complete payload from the front of `buf`.
    pub fn unpack(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize;
        if buf.len() < 4 + len {
            return Ok(None);
        }
        let payload = check_rejection(&buf[4..4 + len])?;
        buf.drain(..4 + len);
        Ok(Some(payload))
    }
}

impl Default for Intermediate {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Full ────────────────────────────────────────────────────────────────────

/// The full framing: `len || seqno || payload || crc32`, where `len` covers
/// the whole frame and the CRC covers everything before it. Both directions
/// keep an independent sequence counter.
pub struct Full {
    send_seq: u32,
    recv_seq: u32,
}

impl Full {
    /// Fresh codec with both counters at zero.
    pub fn new() -> Self {
        Self { send_seq: 0, recv_seq: 0 }
    }

    /// Append a framed `payload` to `out`.
    pub fn pack(&mut self, payload: &[u8], out: &mut Vec<u8>) {
        let len = (payload.len() + 12) as u32;
        let start = out.len();
        out.extend(len.to_le_bytes());
        out.extend(self.send_seq.to_le_bytes());
        out.extend_from_slice(payload);
        let crc = crc32fast::hash(&out[start..]);
        out.extend(crc.to_le_bytes());
        self.send_seq = self.send_seq.wrapping_add(1);
    }

    /// Try to extract one complete payload from the front of `buf`.
    pub fn unpack(&mut self, buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_le_bytes(buf[..4].try_into().unwrap());
        if len < 12 {
            return Err(TransportError::BadLength(len));
        }
        let len = len as usize;
        if buf.len() < len {
            return Ok(None);
        }
        let expected = crc32fast::hash(&buf[..len - 4]);
        let got = u32::from_le_bytes(buf[len - 4..len].try_into().unwrap());
        if expected != got {
            return Err(TransportError::BadCrc { expected, got });
        }
        let seq = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        if seq != self.recv_seq {
            log::debug!("full framing seqno {seq}, expected {}", self.recv_seq);
        }
        self.recv_seq = seq.wrapping_add(1);
        let payload = check_rejection(&buf[8..len - 4])?;
        buf.drain(..len);
        Ok(Some(payload))
    }
}

impl Default for Full {
    fn default() -> Self {
        Self::new()
    }
}
