//! Hand-maintained schema subset.
//!
//! A full client library generates these definitions from the `.tl` schema
//! files; this crate only carries what the invocation core itself needs:
//! service calls (`ping`, `rpc_drop_answer`), one representative API
//! function with flag-conditional fields, and the update containers with
//! their `users`/`chats` side tables.
//!
//! Layout follows the generated convention:
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`types`]     | Concrete constructors (bare types) as `struct`s        |
//! | [`functions`] | RPC functions as `struct`s implementing `RemoteCall`   |
//! | [`enums`]     | Boxed types as `enum`s dispatching on constructor id   |

pub mod enums;
pub mod functions;
pub mod types;
