use tgwire_tl::schema::{enums, functions, types};
use tgwire_tl::{Cursor, Deserializable, RawVec, Serializable, deserialize::Error};

// ── Primitive round-trips ─────────────────────────────────────────────────────

#[test]
fn roundtrip_i32() {
    for v in [0i32, -1, i32::MAX, i32::MIN, 42] {
        assert_eq!(i32::from_bytes(&v.to_bytes()).unwrap(), v);
    }
}

#[test]
fn roundtrip_i64() {
    for v in [0i64, -1, i64::MAX, i64::MIN, 1_234_567_890] {
        assert_eq!(i64::from_bytes(&v.to_bytes()).unwrap(), v);
    }
}

#[test]
fn bool_encodes_as_sentinel_ids() {
    assert_eq!(true.to_bytes(), 0x997275b5u32.to_le_bytes());
    assert_eq!(false.to_bytes(), 0xbc799737u32.to_le_bytes());
    assert!(bool::from_bytes(&true.to_bytes()).unwrap());
    assert!(!bool::from_bytes(&false.to_bytes()).unwrap());
}

// ── Strings / bytes ───────────────────────────────────────────────────────────

#[test]
fn string_is_four_byte_aligned() {
    for s in ["", "a", "ab", "abc", "abcd", "hello world"] {
        let bytes = s.to_owned().to_bytes();
        assert_eq!(bytes.len() % 4, 0, "{s:?} not aligned");
        assert_eq!(String::from_bytes(&bytes).unwrap(), s);
    }
}

#[test]
fn long_string_uses_wide_header() {
    // 254 bytes and above switch to the 0xfe + 3-byte length header.
    let s = "x".repeat(300);
    let bytes = s.clone().to_bytes();
    assert_eq!(bytes[0], 0xfe);
    assert_eq!(bytes.len() % 4, 0);
    assert_eq!(String::from_bytes(&bytes).unwrap(), s);
}

#[test]
fn roundtrip_bytes() {
    let v: Vec<u8> = (0u8..=255).collect();
    assert_eq!(Vec::<u8>::from_bytes(&v.clone().to_bytes()).unwrap(), v);
}

// ── Vectors ───────────────────────────────────────────────────────────────────

#[test]
fn boxed_vector_carries_constructor_id() {
    let v: Vec<i32> = vec![1, 2, 3];
    let bytes = v.to_bytes();
    assert_eq!(&bytes[..4], &0x1cb5c415u32.to_le_bytes());
    assert_eq!(Vec::<i32>::from_bytes(&bytes).unwrap(), vec![1, 2, 3]);
}

#[test]
fn bare_vector_omits_constructor_id() {
    let v = RawVec(vec![7i64, 8]);
    let bytes = v.to_bytes();
    // count + two longs, no id word
    assert_eq!(bytes.len(), 4 + 16);
    assert_eq!(RawVec::<i64>::from_bytes(&bytes).unwrap(), v);
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[test]
fn truncated_input_is_detected() {
    assert_eq!(i32::from_bytes(&[0x01, 0x02]), Err(Error::Truncated));
    assert_eq!(String::from_bytes(&[5, b'a']), Err(Error::Truncated));
}

#[test]
fn unknown_constructor_is_detected() {
    let bytes = 0xdeadbeefu32.to_le_bytes();
    assert_eq!(
        enums::Peer::from_bytes(&bytes),
        Err(Error::UnknownType { id: 0xdeadbeef })
    );
}

// ── Flag-conditional fields ───────────────────────────────────────────────────

#[test]
fn message_flags_roundtrip() {
    let full = types::Message {
        out: true,
        id: 42,
        from_id: Some(enums::Peer::User(types::PeerUser { user_id: 7 })),
        peer_id: enums::Peer::Channel(types::PeerChannel { channel_id: 100 }),
        date: 1_700_000_000,
        message: "edited".into(),
        edit_date: Some(1_700_000_100),
    };
    let bare = types::Message {
        out: false,
        id: 1,
        from_id: None,
        peer_id: enums::Peer::Chat(types::PeerChat { chat_id: 5 }),
        date: 0,
        message: String::new(),
        edit_date: None,
    };
    for msg in [full, bare] {
        let boxed = enums::Message::Message(msg);
        assert_eq!(enums::Message::from_bytes(&boxed.to_bytes()).unwrap(), boxed);
    }
}

#[test]
fn edit_forum_topic_omits_absent_fields() {
    let minimal = functions::channels::EditForumTopic {
        channel: enums::InputChannel::Channel(types::InputChannel {
            channel_id: 10,
            access_hash: 11,
        }),
        topic_id: 42,
        title: None,
        icon_emoji_id: None,
        closed: None,
        hidden: None,
    };
    let titled = functions::channels::EditForumTopic {
        title: Some("New".into()),
        ..minimal.clone()
    };

    let minimal_bytes = minimal.to_bytes();
    let titled_bytes = titled.to_bytes();
    assert!(titled_bytes.len() > minimal_bytes.len());
    // flags word sits right after the constructor id
    assert_eq!(u32::from_le_bytes(minimal_bytes[4..8].try_into().unwrap()), 0);
    assert_eq!(u32::from_le_bytes(titled_bytes[4..8].try_into().unwrap()), 1);

    let back = functions::channels::EditForumTopic::from_bytes(&titled_bytes).unwrap();
    assert_eq!(back, titled);
}

// ── Updates container ─────────────────────────────────────────────────────────

fn sample_message(id: i32, text: &str) -> enums::Message {
    enums::Message::Message(types::Message {
        out: false,
        id,
        from_id: None,
        peer_id: enums::Peer::Channel(types::PeerChannel { channel_id: 9 }),
        date: 1_700_000_000,
        message: text.into(),
        edit_date: None,
    })
}

#[test]
fn updates_container_roundtrip() {
    let container = enums::Updates::Updates(types::Updates {
        updates: vec![
            enums::Update::EditChannelMessage(types::UpdateEditChannelMessage {
                message: sample_message(42, "New"),
                pts: 10,
                pts_count: 1,
            }),
            enums::Update::NewMessage(types::UpdateNewMessage {
                message: sample_message(43, "unrelated"),
                pts: 11,
                pts_count: 1,
            }),
        ],
        users: vec![enums::User::User(types::User {
            id: 7,
            access_hash: Some(99),
            first_name: Some("Ada".into()),
            last_name: None,
            username: None,
        })],
        chats: vec![enums::Chat::Channel(types::Channel {
            id: 9,
            access_hash: Some(77),
            title: "forum".into(),
        })],
        date: 1_700_000_000,
        seq: 0,
    });

    let decoded = enums::Updates::from_bytes(&container.to_bytes()).unwrap();
    assert_eq!(decoded, container);
}

#[test]
fn updates_too_long_is_bodyless() {
    let bytes = enums::Updates::TooLong.to_bytes();
    assert_eq!(bytes, 0xe317af7eu32.to_le_bytes());
    assert_eq!(enums::Updates::from_bytes(&bytes).unwrap(), enums::Updates::TooLong);
}

// ── Cursor behavior ───────────────────────────────────────────────────────────

#[test]
fn cursor_tracks_position_across_values() {
    let mut bytes = Vec::new();
    5i32.serialize(&mut bytes);
    "hi".to_owned().serialize(&mut bytes);
    7i64.serialize(&mut bytes);

    let mut cur = Cursor::from_slice(&bytes);
    assert_eq!(i32::deserialize(&mut cur).unwrap(), 5);
    assert_eq!(String::deserialize(&mut cur).unwrap(), "hi");
    assert_eq!(i64::deserialize(&mut cur).unwrap(), 7);
    assert_eq!(cur.remaining(), 0);
}
