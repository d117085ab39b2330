//! # tgwire — MTProto transport and invocation core
//!
//! `tgwire` wires four focused sub-crates together for convenience:
//!
//! | Sub-crate        | Role                                               |
//! |------------------|----------------------------------------------------|
//! | `tgwire-tl`      | TL binary codec: traits, cursor, schema subset     |
//! | `tgwire-crypto`  | AES-IGE, SHA-1/256, MTProto 2.0 message encryption |
//! | `tgwire-mtproto` | Session state, envelope decoding, transport framing|
//! | `tgwire-sender`  | Async sender: concurrent RPCs, retries, updates    |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tgwire::sender::{Config, Sender};
//! use tgwire::tl::schema::functions;
//!
//! # async fn run(auth_key: [u8; 256]) -> Result<(), tgwire::sender::InvocationError> {
//! let sender = Sender::connect(Config {
//!     addr: "149.154.167.51:443".into(),
//!     auth_key,
//!     ..Config::default()
//! })
//! .await?;
//!
//! let pong = sender.invoke(&functions::Ping { ping_id: 1 }).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Re-export of [`tgwire_tl`]: serialization traits and the schema subset.
pub use tgwire_tl as tl;

/// Re-export of [`tgwire_crypto`]: AES-IGE, SHA macros, auth key, message
/// encryption.
pub use tgwire_crypto as crypto;

/// Re-export of [`tgwire_mtproto`]: session, envelope and transport framing.
pub use tgwire_mtproto as mtproto;

/// Re-export of [`tgwire_sender`]: the async invocation core.
pub use tgwire_sender as sender;
