//! TL binary serialization for the tgwire stack.
//!
//! Unlike a full Telegram client library, this crate does not ship a
//! generated mirror of the entire API schema. It provides the wire-format
//! core (the [`Serializable`] / [`Deserializable`] traits with their
//! primitive impls) plus a small hand-maintained [`schema`] subset: the
//! handful of functions and objects the invocation core and its tests need.
//!
//! # Usage
//!
//! ```rust
//! use tgwire_tl::{Serializable, schema::functions::Ping};
//!
//! let req = Ping { ping_id: 42 };
//! let bytes = req.to_bytes();
//! // Hand `bytes` to a session for encryption and framing…
//! ```

#![deny(unsafe_code)]

pub mod deserialize;
pub mod schema;
pub mod serialize;

pub use deserialize::{Cursor, Deserializable};
pub use serialize::Serializable;

/// Bare `vector` — a length-prefixed list *without* the usual boxed
/// `Vector` constructor id in front. Rare, but some control messages
/// (e.g. `msgs_ack` internals) use it.
#[derive(Clone, Debug, PartialEq)]
pub struct RawVec<T>(pub Vec<T>);

/// An uninterpreted run of bytes, passed through as-is.
///
/// Used as the `Return` type of functions whose result the caller will
/// decode itself (generic `X` in the schema).
#[derive(Clone, Debug, PartialEq)]
pub struct Blob(pub Vec<u8>);

impl From<Vec<u8>> for Blob {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

// ─── Core traits ──────────────────────────────────────────────────────────────

/// Every boxed schema object carries a unique 32-bit constructor id.
pub trait Identifiable {
    /// The constructor id as written in the TL schema.
    const CONSTRUCTOR_ID: u32;
}

/// A function that can be sent to the remote end as an RPC call.
///
/// `Return` is what the server answers with on success.
pub trait RemoteCall: Serializable {
    /// The deserialized response type.
    type Return: Deserializable;
}
