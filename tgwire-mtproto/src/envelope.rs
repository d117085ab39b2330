//! Decoding of server-side MTProto envelopes.
//!
//! Every decrypted message body is one of a small set of service
//! constructors (rpc_result, acks, salt/clock notifications, containers)
//! or an updates payload. [`Envelope::from_bytes`] classifies a body into
//! a tagged enum, transparently inflating `gzip_packed` at any level.

use std::io::Read;

use crate::message::MsgId;

// ─── Envelope constructor IDs ────────────────────────────────────────────────

const ID_RPC_RESULT: u32 = 0xf35c6d01;
const ID_RPC_ERROR: u32 = 0x2144ca19;
const ID_MSG_CONTAINER: u32 = 0x73f1f8dc;
const ID_GZIP_PACKED: u32 = 0x3072cfa1;
const ID_PONG: u32 = 0x347773c5;
const ID_MSGS_ACK: u32 = 0x62d6b459;
const ID_BAD_SERVER_SALT: u32 = 0xedab447b;
const ID_NEW_SESSION: u32 = 0x9ec20908;
const ID_BAD_MSG_NOTIFY: u32 = 0xa7eff811;

/// Errors from envelope decoding.
#[derive(Debug)]
pub enum EnvelopeError {
    /// A constructor body was shorter than its fixed fields require.
    Malformed(&'static str),
    /// A `gzip_packed` body failed to inflate.
    Decompression,
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(what) => write!(f, "malformed envelope: {what}"),
            Self::Decompression => write!(f, "gzip_packed inflation failed"),
        }
    }
}
impl std::error::Error for EnvelopeError {}

/// The payload of an `rpc_result`.
#[derive(Clone, Debug, PartialEq)]
pub enum RpcOutcome {
    /// TL-serialized return value, already un-gzipped.
    Ok(Vec<u8>),
    /// A server-reported `rpc_error`.
    Error {
        /// Numeric error code (e.g. 420).
        code: i32,
        /// Raw error message (e.g. `FLOOD_WAIT_31`).
        message: String,
    },
}

/// A classified server message body.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Answer to a specific request.
    RpcResult {
        /// The msg_id of the request being answered.
        req_msg_id: MsgId,
        /// The result body or server error.
        outcome: RpcOutcome,
    },
    /// Server acknowledgment of the listed client messages.
    Ack(Vec<MsgId>),
    /// The salt we used is stale; retry with `new_salt`.
    BadServerSalt {
        /// The rejected client message.
        bad_msg_id: MsgId,
        /// Salt to adopt.
        new_salt: i64,
    },
    /// The server rejected a client message.
    BadMsgNotification {
        /// The rejected client message.
        bad_msg_id: MsgId,
        /// Rejection reason (16/17 = clock skew).
        error_code: i32,
    },
    /// The server opened a fresh session and supplied its salt.
    NewSession {
        /// Salt for subsequent messages.
        server_salt: i64,
    },
    /// Answer to a ping.
    Pong {
        /// msg_id of the ping request.
        msg_id: MsgId,
        /// Echoed ping id.
        ping_id: i64,
    },
    /// Several envelopes batched into one message.
    Container(Vec<(MsgId, Envelope)>),
    /// An updates payload, left raw for the dispatcher to parse.
    Updates(Vec<u8>),
}

impl Envelope {
    /// Classify a decrypted message body.
    pub fn from_bytes(body: &[u8]) -> Result<Envelope, EnvelopeError> {
        match parse(body, false)? {
            Some(envelope) => Ok(envelope),
            // unknown ids only vanish inside containers
            None => Err(EnvelopeError::Malformed("empty envelope")),
        }
    }
}

fn read_u32(body: &[u8], at: usize) -> Result<u32, EnvelopeError> {
    body.get(at..at + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
        .ok_or(EnvelopeError::Malformed("truncated i32 field"))
}

fn read_i64(body: &[u8], at: usize) -> Result<i64, EnvelopeError> {
    body.get(at..at + 8)
        .map(|b| i64::from_le_bytes(b.try_into().unwrap()))
        .ok_or(EnvelopeError::Malformed("truncated i64 field"))
}

fn parse(body: &[u8], in_container: bool) -> Result<Option<Envelope>, EnvelopeError> {
    let cid = read_u32(body, 0)?;
    match cid {
        ID_RPC_RESULT => {
            let req_msg_id = MsgId(read_i64(body, 4)?);
            let outcome = parse_rpc_outcome(&body[12..])?;
            Ok(Some(Envelope::RpcResult { req_msg_id, outcome }))
        }
        ID_MSGS_ACK => {
            // msgs_ack#62d6b459 msg_ids:Vector<long>
            let vec_id = read_u32(body, 4)?;
            if vec_id != 0x1cb5c415 {
                return Err(EnvelopeError::Malformed("msgs_ack missing vector tag"));
            }
            let count = read_u32(body, 8)? as usize;
            let mut ids = Vec::with_capacity(count);
            for i in 0..count {
                ids.push(MsgId(read_i64(body, 12 + i * 8)?));
            }
            Ok(Some(Envelope::Ack(ids)))
        }
        ID_BAD_SERVER_SALT => {
            // bad_server_salt#edab447b bad_msg_id:long bad_msg_seqno:int
            //   error_code:int new_server_salt:long
            Ok(Some(Envelope::BadServerSalt {
                bad_msg_id: MsgId(read_i64(body, 4)?),
                new_salt: read_i64(body, 20)?,
            }))
        }
        ID_BAD_MSG_NOTIFY => {
            // bad_msg_notification#a7eff811 bad_msg_id:long bad_msg_seqno:int
            //   error_code:int
            Ok(Some(Envelope::BadMsgNotification {
                bad_msg_id: MsgId(read_i64(body, 4)?),
                error_code: read_u32(body, 16)? as i32,
            }))
        }
        ID_NEW_SESSION => {
            // new_session_created#9ec20908 first_msg_id:long unique_id:long
            //   server_salt:long
            Ok(Some(Envelope::NewSession { server_salt: read_i64(body, 20)? }))
        }
        ID_PONG => {
            // pong#347773c5 msg_id:long ping_id:long
            Ok(Some(Envelope::Pong {
                msg_id: MsgId(read_i64(body, 4)?),
                ping_id: read_i64(body, 12)?,
            }))
        }
        ID_MSG_CONTAINER => {
            let count = read_u32(body, 4)? as usize;
            let mut entries = Vec::with_capacity(count);
            let mut pos = 8usize;
            for _ in 0..count {
                // msg_id:long seqno:int bytes:int body
                let msg_id = MsgId(read_i64(body, pos)?);
                let inner_len = read_u32(body, pos + 12)? as usize;
                pos += 16;
                let inner = body
                    .get(pos..pos + inner_len)
                    .ok_or(EnvelopeError::Malformed("container entry overruns body"))?;
                pos += inner_len;
                if let Some(envelope) = parse(inner, true)? {
                    entries.push((msg_id, envelope));
                }
            }
            Ok(Some(Envelope::Container(entries)))
        }
        ID_GZIP_PACKED => {
            let packed = tl_read_bytes(&body[4..])
                .ok_or(EnvelopeError::Malformed("gzip_packed missing data"))?;
            parse(&inflate(&packed)?, in_container)
        }
        _ if in_container && !is_update_id(cid) => {
            log::debug!("skipping unknown constructor {cid:#x} inside container");
            Ok(None)
        }
        _ => Ok(Some(Envelope::Updates(body.to_vec()))),
    }
}

fn parse_rpc_outcome(result: &[u8]) -> Result<RpcOutcome, EnvelopeError> {
    let cid = read_u32(result, 0)?;
    match cid {
        ID_RPC_ERROR => {
            // rpc_error#2144ca19 error_code:int error_message:string
            let code = read_u32(result, 4)? as i32;
            let message = tl_read_bytes(&result[8..])
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default();
            Ok(RpcOutcome::Error { code, message })
        }
        ID_GZIP_PACKED => {
            let packed = tl_read_bytes(&result[4..])
                .ok_or(EnvelopeError::Malformed("gzip_packed missing data"))?;
            parse_rpc_outcome(&inflate(&packed)?)
        }
        _ => Ok(RpcOutcome::Ok(result.to_vec())),
    }
}

fn is_update_id(cid: u32) -> bool {
    matches!(
        cid,
        0x74ae4240 | 0x78d4dec1 | 0x725b04c3 | 0x313bc7f8 | 0x4d6deea5 | 0xe317af7e
    )
}

fn tl_read_bytes(data: &[u8]) -> Option<Vec<u8>> {
    if data.is_empty() {
        return Some(vec![]);
    }
    let (len, start) = if data[0] < 254 {
        (data[0] as usize, 1)
    } else if data.len() >= 4 {
        (data[1] as usize | (data[2] as usize) << 8 | (data[3] as usize) << 16, 4)
    } else {
        return None;
    };
    if data.len() < start + len {
        return None;
    }
    Some(data[start..start + len].to_vec())
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let mut out = Vec::new();
    if flate2::read::GzDecoder::new(data).read_to_end(&mut out).is_ok() && !out.is_empty() {
        return Ok(out);
    }
    out.clear();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| EnvelopeError::Decompression)?;
    Ok(out)
}
