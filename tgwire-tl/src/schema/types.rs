//! Concrete (bare) constructors.
//!
//! Each struct serializes its body only; the constructor id is written by
//! the boxed enum wrapping it. Flag-conditional fields compute their
//! `flags:#` word at encode time from the `Option` / `bool` fields.

use crate::deserialize::{Buffer, Result};
use crate::{Deserializable, Identifiable, Serializable};

use super::enums;

// ─── Peers ───────────────────────────────────────────────────────────────────

/// `peerUser#59511722 user_id:long`
#[derive(Clone, Debug, PartialEq)]
pub struct PeerUser {
    pub user_id: i64,
}

impl Identifiable for PeerUser {
    const CONSTRUCTOR_ID: u32 = 0x59511722;
}

impl Serializable for PeerUser {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.user_id.serialize(buf);
    }
}

impl Deserializable for PeerUser {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { user_id: i64::deserialize(buf)? })
    }
}

/// `peerChat#36c6019a chat_id:long`
#[derive(Clone, Debug, PartialEq)]
pub struct PeerChat {
    pub chat_id: i64,
}

impl Identifiable for PeerChat {
    const CONSTRUCTOR_ID: u32 = 0x36c6019a;
}

impl Serializable for PeerChat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.chat_id.serialize(buf);
    }
}

impl Deserializable for PeerChat {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { chat_id: i64::deserialize(buf)? })
    }
}

/// `peerChannel#a2a5371e channel_id:long`
#[derive(Clone, Debug, PartialEq)]
pub struct PeerChannel {
    pub channel_id: i64,
}

impl Identifiable for PeerChannel {
    const CONSTRUCTOR_ID: u32 = 0xa2a5371e;
}

impl Serializable for PeerChannel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.channel_id.serialize(buf);
    }
}

impl Deserializable for PeerChannel {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { channel_id: i64::deserialize(buf)? })
    }
}

/// `inputChannel#f35aec28 channel_id:long access_hash:long`
#[derive(Clone, Debug, PartialEq)]
pub struct InputChannel {
    pub channel_id: i64,
    pub access_hash: i64,
}

impl Identifiable for InputChannel {
    const CONSTRUCTOR_ID: u32 = 0xf35aec28;
}

impl Serializable for InputChannel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.channel_id.serialize(buf);
        self.access_hash.serialize(buf);
    }
}

impl Deserializable for InputChannel {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            channel_id: i64::deserialize(buf)?,
            access_hash: i64::deserialize(buf)?,
        })
    }
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// `message#38116ee0 flags:# out:flags.1?true id:int from_id:flags.8?Peer
/// peer_id:Peer date:int message:string edit_date:flags.15?int`
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub out: bool,
    pub id: i32,
    pub from_id: Option<enums::Peer>,
    pub peer_id: enums::Peer,
    pub date: i32,
    pub message: String,
    pub edit_date: Option<i32>,
}

impl Message {
    fn flags(&self) -> u32 {
        let mut flags = 0u32;
        if self.out {
            flags |= 1 << 1;
        }
        if self.from_id.is_some() {
            flags |= 1 << 8;
        }
        if self.edit_date.is_some() {
            flags |= 1 << 15;
        }
        flags
    }
}

impl Identifiable for Message {
    const CONSTRUCTOR_ID: u32 = 0x38116ee0;
}

impl Serializable for Message {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.flags().serialize(buf);
        self.id.serialize(buf);
        self.from_id.serialize(buf);
        self.peer_id.serialize(buf);
        self.date.serialize(buf);
        self.message.serialize(buf);
        self.edit_date.serialize(buf);
    }
}

impl Deserializable for Message {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let flags = u32::deserialize(buf)?;
        let out = flags & (1 << 1) != 0;
        let id = i32::deserialize(buf)?;
        let from_id = if flags & (1 << 8) != 0 {
            Some(enums::Peer::deserialize(buf)?)
        } else {
            None
        };
        let peer_id = enums::Peer::deserialize(buf)?;
        let date = i32::deserialize(buf)?;
        let message = String::deserialize(buf)?;
        let edit_date = if flags & (1 << 15) != 0 {
            Some(i32::deserialize(buf)?)
        } else {
            None
        };
        Ok(Self { out, id, from_id, peer_id, date, message, edit_date })
    }
}

/// `messageEmpty#90a6ca84 id:int`
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEmpty {
    pub id: i32,
}

impl Identifiable for MessageEmpty {
    const CONSTRUCTOR_ID: u32 = 0x90a6ca84;
}

impl Serializable for MessageEmpty {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.id.serialize(buf);
    }
}

impl Deserializable for MessageEmpty {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { id: i32::deserialize(buf)? })
    }
}

// ─── User / Chat ─────────────────────────────────────────────────────────────

/// `user#83314fca flags:# id:long access_hash:flags.0?long
/// first_name:flags.1?string last_name:flags.2?string username:flags.3?string`
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    fn flags(&self) -> u32 {
        let mut flags = 0u32;
        if self.access_hash.is_some() {
            flags |= 1 << 0;
        }
        if self.first_name.is_some() {
            flags |= 1 << 1;
        }
        if self.last_name.is_some() {
            flags |= 1 << 2;
        }
        if self.username.is_some() {
            flags |= 1 << 3;
        }
        flags
    }
}

impl Identifiable for User {
    const CONSTRUCTOR_ID: u32 = 0x83314fca;
}

impl Serializable for User {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.flags().serialize(buf);
        self.id.serialize(buf);
        self.access_hash.serialize(buf);
        self.first_name.serialize(buf);
        self.last_name.serialize(buf);
        self.username.serialize(buf);
    }
}

impl Deserializable for User {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let flags = u32::deserialize(buf)?;
        let id = i64::deserialize(buf)?;
        let access_hash = if flags & 1 != 0 { Some(i64::deserialize(buf)?) } else { None };
        let first_name =
            if flags & (1 << 1) != 0 { Some(String::deserialize(buf)?) } else { None };
        let last_name =
            if flags & (1 << 2) != 0 { Some(String::deserialize(buf)?) } else { None };
        let username =
            if flags & (1 << 3) != 0 { Some(String::deserialize(buf)?) } else { None };
        Ok(Self { id, access_hash, first_name, last_name, username })
    }
}

/// `userEmpty#d3bc4b7a id:long`
#[derive(Clone, Debug, PartialEq)]
pub struct UserEmpty {
    pub id: i64,
}

impl Identifiable for UserEmpty {
    const CONSTRUCTOR_ID: u32 = 0xd3bc4b7a;
}

impl Serializable for UserEmpty {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.id.serialize(buf);
    }
}

impl Deserializable for UserEmpty {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { id: i64::deserialize(buf)? })
    }
}

/// `chat#41cbf256 id:long title:string`
#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub id: i64,
    pub title: String,
}

impl Identifiable for Chat {
    const CONSTRUCTOR_ID: u32 = 0x41cbf256;
}

impl Serializable for Chat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.id.serialize(buf);
        self.title.serialize(buf);
    }
}

impl Deserializable for Chat {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            id: i64::deserialize(buf)?,
            title: String::deserialize(buf)?,
        })
    }
}

/// `channel#fe4478bd flags:# id:long access_hash:flags.13?long title:string`
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub title: String,
}

impl Identifiable for Channel {
    const CONSTRUCTOR_ID: u32 = 0xfe4478bd;
}

impl Serializable for Channel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let flags = if self.access_hash.is_some() { 1u32 << 13 } else { 0 };
        flags.serialize(buf);
        self.id.serialize(buf);
        self.access_hash.serialize(buf);
        self.title.serialize(buf);
    }
}

impl Deserializable for Channel {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let flags = u32::deserialize(buf)?;
        let id = i64::deserialize(buf)?;
        let access_hash =
            if flags & (1 << 13) != 0 { Some(i64::deserialize(buf)?) } else { None };
        let title = String::deserialize(buf)?;
        Ok(Self { id, access_hash, title })
    }
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// `updateNewMessage#1f2b0afd message:Message pts:int pts_count:int`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateNewMessage {
    pub message: enums::Message,
    pub pts: i32,
    pub pts_count: i32,
}

impl Identifiable for UpdateNewMessage {
    const CONSTRUCTOR_ID: u32 = 0x1f2b0afd;
}

impl Serializable for UpdateNewMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
    }
}

impl Deserializable for UpdateNewMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            message: enums::Message::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
        })
    }
}

/// `updateNewChannelMessage#62ba04d9 message:Message pts:int pts_count:int`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateNewChannelMessage {
    pub message: enums::Message,
    pub pts: i32,
    pub pts_count: i32,
}

impl Identifiable for UpdateNewChannelMessage {
    const CONSTRUCTOR_ID: u32 = 0x62ba04d9;
}

impl Serializable for UpdateNewChannelMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
    }
}

impl Deserializable for UpdateNewChannelMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            message: enums::Message::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
        })
    }
}

/// `updateEditMessage#e40370a3 message:Message pts:int pts_count:int`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateEditMessage {
    pub message: enums::Message,
    pub pts: i32,
    pub pts_count: i32,
}

impl Identifiable for UpdateEditMessage {
    const CONSTRUCTOR_ID: u32 = 0xe40370a3;
}

impl Serializable for UpdateEditMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
    }
}

impl Deserializable for UpdateEditMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            message: enums::Message::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
        })
    }
}

/// `updateEditChannelMessage#1b3f4df7 message:Message pts:int pts_count:int`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateEditChannelMessage {
    pub message: enums::Message,
    pub pts: i32,
    pub pts_count: i32,
}

impl Identifiable for UpdateEditChannelMessage {
    const CONSTRUCTOR_ID: u32 = 0x1b3f4df7;
}

impl Serializable for UpdateEditChannelMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
    }
}

impl Deserializable for UpdateEditChannelMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            message: enums::Message::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
        })
    }
}

/// `updateNewScheduledMessage#39a51dfb message:Message`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateNewScheduledMessage {
    pub message: enums::Message,
}

impl Identifiable for UpdateNewScheduledMessage {
    const CONSTRUCTOR_ID: u32 = 0x39a51dfb;
}

impl Serializable for UpdateNewScheduledMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.message.serialize(buf);
    }
}

impl Deserializable for UpdateNewScheduledMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { message: enums::Message::deserialize(buf)? })
    }
}

// ─── Updates containers ──────────────────────────────────────────────────────

/// `updateShort#78d4dec1 update:Update date:int`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateShort {
    pub update: enums::Update,
    pub date: i32,
}

impl Identifiable for UpdateShort {
    const CONSTRUCTOR_ID: u32 = 0x78d4dec1;
}

impl Serializable for UpdateShort {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.update.serialize(buf);
        self.date.serialize(buf);
    }
}

impl Deserializable for UpdateShort {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            update: enums::Update::deserialize(buf)?,
            date: i32::deserialize(buf)?,
        })
    }
}

/// `updates#74ae4240 updates:Vector<Update> users:Vector<User>
/// chats:Vector<Chat> date:int seq:int`
#[derive(Clone, Debug, PartialEq)]
pub struct Updates {
    pub updates: Vec<enums::Update>,
    pub users: Vec<enums::User>,
    pub chats: Vec<enums::Chat>,
    pub date: i32,
    pub seq: i32,
}

impl Identifiable for Updates {
    const CONSTRUCTOR_ID: u32 = 0x74ae4240;
}

impl Serializable for Updates {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.updates.serialize(buf);
        self.users.serialize(buf);
        self.chats.serialize(buf);
        self.date.serialize(buf);
        self.seq.serialize(buf);
    }
}

impl Deserializable for Updates {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            updates: Vec::<enums::Update>::deserialize(buf)?,
            users: Vec::<enums::User>::deserialize(buf)?,
            chats: Vec::<enums::Chat>::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            seq: i32::deserialize(buf)?,
        })
    }
}

// ─── Service objects ─────────────────────────────────────────────────────────

/// `pong#347773c5 msg_id:long ping_id:long`
#[derive(Clone, Debug, PartialEq)]
pub struct Pong {
    pub msg_id: i64,
    pub ping_id: i64,
}

impl Identifiable for Pong {
    const CONSTRUCTOR_ID: u32 = 0x347773c5;
}

impl Serializable for Pong {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.msg_id.serialize(buf);
        self.ping_id.serialize(buf);
    }
}

impl Deserializable for Pong {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            msg_id: i64::deserialize(buf)?,
            ping_id: i64::deserialize(buf)?,
        })
    }
}

/// `rpc_answer_dropped#a43ad8b7 msg_id:long seq_no:int bytes:int`
#[derive(Clone, Debug, PartialEq)]
pub struct RpcAnswerDropped {
    pub msg_id: i64,
    pub seq_no: i32,
    pub bytes: i32,
}

impl Identifiable for RpcAnswerDropped {
    const CONSTRUCTOR_ID: u32 = 0xa43ad8b7;
}

impl Serializable for RpcAnswerDropped {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.msg_id.serialize(buf);
        self.seq_no.serialize(buf);
        self.bytes.serialize(buf);
    }
}

impl Deserializable for RpcAnswerDropped {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            msg_id: i64::deserialize(buf)?,
            seq_no: i32::deserialize(buf)?,
            bytes: i32::deserialize(buf)?,
        })
    }
}
