//! RPC functions. Each implements [`RemoteCall`] with its response type.
//!
//! Functions serialize *with* their constructor id up front (they are
//! always boxed on the wire).

use crate::deserialize::{Buffer, Result};
use crate::{Deserializable, Identifiable, RemoteCall, Serializable};

use super::enums;

/// `ping#7abe77ec ping_id:long = Pong`
#[derive(Clone, Debug, PartialEq)]
pub struct Ping {
    pub ping_id: i64,
}

impl Identifiable for Ping {
    const CONSTRUCTOR_ID: u32 = 0x7abe77ec;
}

impl Serializable for Ping {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.ping_id.serialize(buf);
    }
}

impl RemoteCall for Ping {
    type Return = enums::Pong;
}

/// `rpc_drop_answer#58e4a740 req_msg_id:long = RpcDropAnswer`
///
/// Asks the server to forget about a query we no longer await.
#[derive(Clone, Debug, PartialEq)]
pub struct RpcDropAnswer {
    pub req_msg_id: i64,
}

impl Identifiable for RpcDropAnswer {
    const CONSTRUCTOR_ID: u32 = 0x58e4a740;
}

impl Serializable for RpcDropAnswer {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.req_msg_id.serialize(buf);
    }
}

impl RemoteCall for RpcDropAnswer {
    type Return = enums::RpcDropAnswer;
}

pub mod channels {
    //! Channel-namespace functions.

    use super::*;

    /// `channels.editForumTopic#f4dfa185 flags:# channel:InputChannel
    /// topic_id:int title:flags.0?string icon_emoji_id:flags.1?long
    /// closed:flags.2?Bool hidden:flags.3?Bool = Updates`
    ///
    /// The representative "wrapper-backed" call: flag-conditional fields
    /// and an `Updates` return the caller has to filter.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EditForumTopic {
        pub channel: enums::InputChannel,
        pub topic_id: i32,
        pub title: Option<String>,
        pub icon_emoji_id: Option<i64>,
        pub closed: Option<bool>,
        pub hidden: Option<bool>,
    }

    impl EditForumTopic {
        fn flags(&self) -> u32 {
            let mut flags = 0u32;
            if self.title.is_some() {
                flags |= 1 << 0;
            }
            if self.icon_emoji_id.is_some() {
                flags |= 1 << 1;
            }
            if self.closed.is_some() {
                flags |= 1 << 2;
            }
            if self.hidden.is_some() {
                flags |= 1 << 3;
            }
            flags
        }
    }

    impl Identifiable for EditForumTopic {
        const CONSTRUCTOR_ID: u32 = 0xf4dfa185;
    }

    impl Serializable for EditForumTopic {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.flags().serialize(buf);
            self.channel.serialize(buf);
            self.topic_id.serialize(buf);
            self.title.serialize(buf);
            self.icon_emoji_id.serialize(buf);
            self.closed.serialize(buf);
            self.hidden.serialize(buf);
        }
    }

    impl RemoteCall for EditForumTopic {
        type Return = enums::Updates;
    }
}

// Functions are only ever decoded server-side; for tests it is still handy
// to read them back.

impl Deserializable for Ping {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            Self::CONSTRUCTOR_ID => Ok(Self { ping_id: i64::deserialize(buf)? }),
            id => Err(crate::deserialize::Error::UnknownType { id }),
        }
    }
}

impl Deserializable for RpcDropAnswer {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            Self::CONSTRUCTOR_ID => Ok(Self { req_msg_id: i64::deserialize(buf)? }),
            id => Err(crate::deserialize::Error::UnknownType { id }),
        }
    }
}

impl Deserializable for channels::EditForumTopic {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            Self::CONSTRUCTOR_ID => {}
            id => return Err(crate::deserialize::Error::UnknownType { id }),
        }
        let flags = u32::deserialize(buf)?;
        let channel = enums::InputChannel::deserialize(buf)?;
        let topic_id = i32::deserialize(buf)?;
        let title = if flags & 1 != 0 { Some(String::deserialize(buf)?) } else { None };
        let icon_emoji_id =
            if flags & (1 << 1) != 0 { Some(i64::deserialize(buf)?) } else { None };
        let closed = if flags & (1 << 2) != 0 { Some(bool::deserialize(buf)?) } else { None };
        let hidden = if flags & (1 << 3) != 0 { Some(bool::deserialize(buf)?) } else { None };
        Ok(Self { channel, topic_id, title, icon_emoji_id, closed, hidden })
    }
}
