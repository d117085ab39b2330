//! Classification of raw update payloads and message-update selection.
//!
//! The reader task hands every non-RPC payload to [`parse_updates`], which
//! turns the raw bytes into [`Update`] values for the dispatcher. The
//! [`first_message_update`] / [`all_message_updates`] helpers implement the
//! selection step wrapper methods perform on an `Updates` container.

use std::collections::HashMap;

use tgwire_tl::schema::{enums, types};
use tgwire_tl::{Cursor, Deserializable};

const ID_UPDATES: u32 = 0x74ae4240;
const ID_UPDATE_SHORT: u32 = 0x78d4dec1;
const ID_UPDATES_TOO_LONG: u32 = 0xe317af7e;

// ─── Update ──────────────────────────────────────────────────────────────────

/// An update pushed by the server, classified for handlers.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    /// A new message (chat, channel, or scheduled).
    NewMessage(enums::Message),
    /// An existing message was edited.
    MessageEdited(enums::Message),
    /// An update variant not mapped to any of the above.
    Raw {
        /// Constructor id of the unmapped payload.
        constructor_id: u32,
        /// The raw TL bytes.
        bytes: Vec<u8>,
    },
}

fn from_single_update(update: enums::Update) -> Update {
    match update {
        enums::Update::NewMessage(u) => Update::NewMessage(u.message),
        enums::Update::NewChannelMessage(u) => Update::NewMessage(u.message),
        enums::Update::NewScheduledMessage(u) => Update::NewMessage(u.message),
        enums::Update::EditMessage(u) => Update::MessageEdited(u.message),
        enums::Update::EditChannelMessage(u) => Update::MessageEdited(u.message),
    }
}

/// Parse a raw updates payload into zero or more [`Update`]s.
pub fn parse_updates(bytes: &[u8]) -> Vec<Update> {
    if bytes.len() < 4 {
        return vec![];
    }
    let cid = u32::from_le_bytes(bytes[..4].try_into().unwrap());

    match cid {
        ID_UPDATES_TOO_LONG => {
            log::warn!("updatesTooLong received, some updates may be missed");
            vec![]
        }
        ID_UPDATE_SHORT => {
            let mut cur = Cursor::from_slice(bytes);
            match enums::Updates::deserialize(&mut cur) {
                Ok(enums::Updates::Short(u)) => vec![from_single_update(u.update)],
                Ok(_) => vec![],
                Err(e) => {
                    log::warn!("updateShort parse error: {e}");
                    vec![]
                }
            }
        }
        ID_UPDATES => {
            let mut cur = Cursor::from_slice(bytes);
            match enums::Updates::deserialize(&mut cur) {
                Ok(enums::Updates::Updates(u)) => {
                    u.updates.into_iter().map(from_single_update).collect()
                }
                Ok(_) => vec![],
                Err(e) => {
                    log::warn!("updates parse error: {e}");
                    vec![]
                }
            }
        }
        _ => vec![Update::Raw { constructor_id: cid, bytes: bytes.to_vec() }],
    }
}

// ─── Message-update selection ────────────────────────────────────────────────

/// A message-bearing update extracted from an `Updates` container, together
/// with the sender's `users`/`chats` side tables keyed by id.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageUpdate {
    /// The new or edited message.
    pub message: enums::Message,
    /// Users referenced by the container.
    pub users: HashMap<i64, enums::User>,
    /// Chats and channels referenced by the container.
    pub chats: HashMap<i64, enums::Chat>,
}

fn message_of(update: &enums::Update) -> Option<&enums::Message> {
    match update {
        enums::Update::NewMessage(u) => Some(&u.message),
        enums::Update::NewChannelMessage(u) => Some(&u.message),
        enums::Update::NewScheduledMessage(u) => Some(&u.message),
        enums::Update::EditMessage(u) => Some(&u.message),
        enums::Update::EditChannelMessage(u) => Some(&u.message),
    }
}

fn side_tables(
    users: &[enums::User],
    chats: &[enums::Chat],
) -> (HashMap<i64, enums::User>, HashMap<i64, enums::Chat>) {
    let users = users.iter().map(|u| (u.id(), u.clone())).collect();
    let chats = chats.iter().map(|c| (c.id(), c.clone())).collect();
    (users, chats)
}

/// Select the first message-bearing update from `updates`, in delivery order.
///
/// `None` when the container holds no message update; that is a valid
/// outcome, not an error. When several updates qualify (e.g. a service
/// message alongside the edit) the first one wins.
pub fn first_message_update(updates: enums::Updates) -> Option<MessageUpdate> {
    match updates {
        enums::Updates::Updates(container) => {
            let message = container.updates.iter().find_map(message_of)?.clone();
            let (users, chats) = side_tables(&container.users, &container.chats);
            Some(MessageUpdate { message, users, chats })
        }
        enums::Updates::Short(short) => message_of(&short.update).map(|m| MessageUpdate {
            message: m.clone(),
            users: HashMap::new(),
            chats: HashMap::new(),
        }),
        enums::Updates::TooLong => None,
    }
}

/// Select every message-bearing update from `updates`, in delivery order.
pub fn all_message_updates(updates: enums::Updates) -> Vec<MessageUpdate> {
    match updates {
        enums::Updates::Updates(container) => {
            let (users, chats) = side_tables(&container.users, &container.chats);
            container
                .updates
                .iter()
                .filter_map(message_of)
                .map(|m| MessageUpdate {
                    message: m.clone(),
                    users: users.clone(),
                    chats: chats.clone(),
                })
                .collect()
        }
        enums::Updates::Short(short) => message_of(&short.update)
            .map(|m| MessageUpdate {
                message: m.clone(),
                users: HashMap::new(),
                chats: HashMap::new(),
            })
            .into_iter()
            .collect(),
        enums::Updates::TooLong => vec![],
    }
}
