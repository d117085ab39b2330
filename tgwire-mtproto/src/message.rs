//! Message identifiers and the decrypted inner frame.

/// A 64-bit MTProto message identifier.
///
/// The upper 32 bits carry server-corrected Unix seconds, the lower 32 bits
/// a sub-second component. The low two bits are `00` for client messages and
/// `01`/`11` for server messages.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MsgId(pub i64);

impl MsgId {
    /// The Unix seconds embedded in this identifier.
    pub fn unix_secs(self) -> i64 {
        (self.0 as u64 >> 32) as i64
    }
}

impl std::fmt::Display for MsgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The inner payload extracted from a successfully decrypted frame.
#[derive(Debug)]
pub struct PlainMessage {
    /// Server salt the sender embedded.
    pub salt: i64,
    /// Session identifier from the frame.
    pub session_id: i64,
    /// Identifier of the inner message.
    pub msg_id: MsgId,
    /// Sequence number of the inner message.
    pub seq_no: i32,
    /// TL-serialized body.
    pub body: Vec<u8>,
}
