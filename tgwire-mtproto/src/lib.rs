//! MTProto session and transport plumbing.
//!
//! This crate handles:
//! * Session state (message ids, sequence numbers, server salts, clock skew)
//! * Encryption and decryption of wire frames via [`tgwire_crypto`]
//! * Classification of server envelopes (rpc_result, acks, containers, ...)
//! * Sans-io transport framing (abridged, intermediate, full)
//!
//! It is intentionally transport-agnostic: bring your own TCP/WebSocket.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod message;
pub mod session;
pub mod transport;

pub use envelope::{Envelope, RpcOutcome};
pub use message::{MsgId, PlainMessage};
pub use session::{Session, UnwrapError};
pub use transport::{Codec, Framing, TransportError};
