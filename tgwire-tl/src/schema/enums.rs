//! Boxed types: constructor-id-tagged unions over the bare [`super::types`].
//!
//! Serialization writes the variant's constructor id followed by its bare
//! body; deserialization dispatches on the id and fails with `UnknownType`
//! for anything outside the closed set.

use crate::deserialize::{Buffer, Error, Result};
use crate::{Deserializable, Identifiable, Serializable};

use super::types;

macro_rules! boxed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $variant:ident ( $ty:ty ) ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub enum $name {
            $( $variant($ty), )+
        }

        impl Serializable for $name {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                match self {
                    $(
                        Self::$variant(x) => {
                            <$ty as Identifiable>::CONSTRUCTOR_ID.serialize(buf);
                            x.serialize(buf);
                        }
                    )+
                }
            }
        }

        impl Deserializable for $name {
            fn deserialize(buf: Buffer) -> Result<Self> {
                match u32::deserialize(buf)? {
                    $(
                        <$ty as Identifiable>::CONSTRUCTOR_ID =>
                            Ok(Self::$variant(<$ty>::deserialize(buf)?)),
                    )+
                    id => Err(Error::UnknownType { id }),
                }
            }
        }
    };
}

boxed_enum! {
    /// `Peer`
    Peer {
        User(types::PeerUser),
        Chat(types::PeerChat),
        Channel(types::PeerChannel),
    }
}

boxed_enum! {
    /// `Message`
    Message {
        Message(types::Message),
        Empty(types::MessageEmpty),
    }
}

impl Message {
    /// The message id, present on every variant.
    pub fn id(&self) -> i32 {
        match self {
            Self::Message(m) => m.id,
            Self::Empty(m) => m.id,
        }
    }
}

boxed_enum! {
    /// `User`
    User {
        User(types::User),
        Empty(types::UserEmpty),
    }
}

impl User {
    /// The user id, present on every variant.
    pub fn id(&self) -> i64 {
        match self {
            Self::User(u) => u.id,
            Self::Empty(u) => u.id,
        }
    }
}

boxed_enum! {
    /// `Chat`
    Chat {
        Chat(types::Chat),
        Channel(types::Channel),
    }
}

impl Chat {
    /// The chat or channel id.
    pub fn id(&self) -> i64 {
        match self {
            Self::Chat(c) => c.id,
            Self::Channel(c) => c.id,
        }
    }
}

/// `InputChannel`
#[derive(Clone, Debug, PartialEq)]
pub enum InputChannel {
    /// `inputChannel#f35aec28`
    Channel(types::InputChannel),
    /// `inputChannelEmpty#ee8c1e86`
    Empty,
}

const ID_INPUT_CHANNEL_EMPTY: u32 = 0xee8c1e86;

impl Serializable for InputChannel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Channel(x) => {
                types::InputChannel::CONSTRUCTOR_ID.serialize(buf);
                x.serialize(buf);
            }
            Self::Empty => ID_INPUT_CHANNEL_EMPTY.serialize(buf),
        }
    }
}

impl Deserializable for InputChannel {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            types::InputChannel::CONSTRUCTOR_ID => {
                Ok(Self::Channel(types::InputChannel::deserialize(buf)?))
            }
            ID_INPUT_CHANNEL_EMPTY => Ok(Self::Empty),
            id => Err(Error::UnknownType { id }),
        }
    }
}

boxed_enum! {
    /// `Update`
    Update {
        NewMessage(types::UpdateNewMessage),
        NewChannelMessage(types::UpdateNewChannelMessage),
        EditMessage(types::UpdateEditMessage),
        EditChannelMessage(types::UpdateEditChannelMessage),
        NewScheduledMessage(types::UpdateNewScheduledMessage),
    }
}

/// `Updates` — what write RPCs return and what the server pushes.
#[derive(Clone, Debug, PartialEq)]
pub enum Updates {
    /// `updates#74ae4240` — full container with `users`/`chats` side tables.
    Updates(types::Updates),
    /// `updateShort#78d4dec1` — a single update, no side tables.
    Short(types::UpdateShort),
    /// `updatesTooLong#e317af7e` — the gap is too large; fetch the
    /// difference out of band.
    TooLong,
}

const ID_UPDATES_TOO_LONG: u32 = 0xe317af7e;

impl Serializable for Updates {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Updates(x) => {
                types::Updates::CONSTRUCTOR_ID.serialize(buf);
                x.serialize(buf);
            }
            Self::Short(x) => {
                types::UpdateShort::CONSTRUCTOR_ID.serialize(buf);
                x.serialize(buf);
            }
            Self::TooLong => ID_UPDATES_TOO_LONG.serialize(buf),
        }
    }
}

impl Deserializable for Updates {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            types::Updates::CONSTRUCTOR_ID => Ok(Self::Updates(types::Updates::deserialize(buf)?)),
            types::UpdateShort::CONSTRUCTOR_ID => {
                Ok(Self::Short(types::UpdateShort::deserialize(buf)?))
            }
            ID_UPDATES_TOO_LONG => Ok(Self::TooLong),
            id => Err(Error::UnknownType { id }),
        }
    }
}

boxed_enum! {
    /// `Pong`
    Pong {
        Pong(types::Pong),
    }
}

// `RpcDropAnswer` has two bodyless variants, so the macro does not fit.

/// `RpcDropAnswer`
#[derive(Clone, Debug, PartialEq)]
pub enum RpcDropAnswer {
    /// `rpc_answer_unknown#5e2ad36e` — the server never saw the query.
    Unknown,
    /// `rpc_answer_dropped_running#cd78e586` — too late, already executing.
    DroppedRunning,
    /// `rpc_answer_dropped#a43ad8b7` — the answer was discarded.
    Dropped(types::RpcAnswerDropped),
}

const ID_ANSWER_UNKNOWN: u32 = 0x5e2ad36e;
const ID_ANSWER_DROPPED_RUNNING: u32 = 0xcd78e586;

impl Serializable for RpcDropAnswer {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Unknown => ID_ANSWER_UNKNOWN.serialize(buf),
            Self::DroppedRunning => ID_ANSWER_DROPPED_RUNNING.serialize(buf),
            Self::Dropped(x) => {
                types::RpcAnswerDropped::CONSTRUCTOR_ID.serialize(buf);
                x.serialize(buf);
            }
        }
    }
}

impl Deserializable for RpcDropAnswer {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            ID_ANSWER_UNKNOWN => Ok(Self::Unknown),
            ID_ANSWER_DROPPED_RUNNING => Ok(Self::DroppedRunning),
            types::RpcAnswerDropped::CONSTRUCTOR_ID => {
                Ok(Self::Dropped(types::RpcAnswerDropped::deserialize(buf)?))
            }
            id => Err(Error::UnknownType { id }),
        }
    }
}
