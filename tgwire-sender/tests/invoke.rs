//! End-to-end tests against an in-process mock server.
//!
//! The server side is driven by hand: decrypt with the client-side key
//! material, parse the inner header, answer with hand-built envelopes. This
//! keeps every byte the sender receives under test control.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tgwire_crypto::{AuthKey, Side, decrypt_message, encrypt_message};
use tgwire_mtproto::Framing;
use tgwire_mtproto::transport::Abridged;
use tgwire_sender::{Config, InvocationError, Sender, Update, first_message_update};
use tgwire_tl::schema::{enums, functions, types};
use tgwire_tl::{Identifiable, Serializable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const AUTH_KEY: [u8; 256] = {
    let mut k = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        k[i] = (i as u8).wrapping_mul(7);
        i += 1;
    }
    k
};

const FIRST_SALT: i64 = 0x0123456789abcdef;

fn test_config(addr: String) -> Config {
    Config {
        addr,
        auth_key: AUTH_KEY,
        first_salt: FIRST_SALT,
        framing: Framing::Abridged,
        default_timeout: Duration::from_secs(5),
        reconnect_attempts: 5,
        reconnect_delay: Duration::from_millis(20),
        ping_interval: None,
        ..Config::default()
    }
}

// ─── Mock server ──────────────────────────────────────────────────────────────

struct Received {
    msg_id: i64,
    salt: i64,
    body: Vec<u8>,
}

impl Received {
    fn constructor_id(&self) -> u32 {
        u32::from_le_bytes(self.body[..4].try_into().unwrap())
    }
}

struct ServerConn {
    stream: TcpStream,
    key: AuthKey,
    rx: Abridged,
    tx: Abridged,
    buf: Vec<u8>,
    init_stripped: bool,
    session_id: i64,
    salt: i64,
}

impl ServerConn {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = listener.accept().await.unwrap();
        Self {
            stream,
            key: AuthKey::from_bytes(AUTH_KEY),
            rx: Abridged::accepting(),
            tx: Abridged::accepting(),
            buf: Vec::new(),
            init_stripped: false,
            session_id: 0,
            salt: FIRST_SALT,
        }
    }

    /// Rebuild a connection after a drop, keeping the session identity the
    /// first connection learned.
    fn adopt(stream: TcpStream, session_id: i64, salt: i64) -> Self {
        Self {
            stream,
            key: AuthKey::from_bytes(AUTH_KEY),
            rx: Abridged::accepting(),
            tx: Abridged::accepting(),
            buf: Vec::new(),
            init_stripped: false,
            session_id,
            salt,
        }
    }

    async fn recv(&mut self) -> Received {
        loop {
            if let Some(frame) = self.rx.unpack(&mut self.buf).unwrap() {
                let plain = decrypt_message(&frame, &self.key, Side::Client).unwrap();
                let salt = i64::from_le_bytes(plain[..8].try_into().unwrap());
                self.session_id = i64::from_le_bytes(plain[8..16].try_into().unwrap());
                let msg_id = i64::from_le_bytes(plain[16..24].try_into().unwrap());
                let len = u32::from_le_bytes(plain[28..32].try_into().unwrap()) as usize;
                let body = plain[32..32 + len].to_vec();
                return Received { msg_id, salt, body };
            }
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).await.unwrap();
            assert_ne!(n, 0, "client closed the connection mid-test");
            let mut data = &chunk[..n];
            if !self.init_stripped {
                assert_eq!(data[0], 0xef, "first byte must be the abridged init");
                data = &data[1..];
                self.init_stripped = true;
            }
            self.buf.extend_from_slice(data);
        }
    }

    async fn send_body(&mut self, body: &[u8]) {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        let msg_id = (secs << 32) | 3;
        let mut inner = Vec::with_capacity(32 + body.len());
        inner.extend(self.salt.to_le_bytes());
        inner.extend(self.session_id.to_le_bytes());
        inner.extend(msg_id.to_le_bytes());
        inner.extend(1i32.to_le_bytes());
        inner.extend((body.len() as u32).to_le_bytes());
        inner.extend_from_slice(body);
        let frame = encrypt_message(&inner, &self.key, Side::Server);
        let mut wire = Vec::new();
        self.tx.pack(&frame, &mut wire);
        self.stream.write_all(&wire).await.unwrap();
    }

    /// Frame arbitrary bytes without encrypting them.
    async fn send_raw(&mut self, frame: &[u8]) {
        let mut wire = Vec::new();
        self.tx.pack(frame, &mut wire);
        self.stream.write_all(&wire).await.unwrap();
    }
}

// ─── Envelope builders ───────────────────────────────────────────────────────

fn rpc_result(req_msg_id: i64, result: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(12 + result.len());
    body.extend(0xf35c6d01u32.to_le_bytes());
    body.extend(req_msg_id.to_le_bytes());
    body.extend_from_slice(result);
    body
}

fn rpc_error(code: i32, message: &str) -> Vec<u8> {
    let mut result = Vec::new();
    result.extend(0x2144ca19u32.to_le_bytes());
    code.serialize(&mut result);
    message.to_string().serialize(&mut result);
    result
}

fn pong_body(req_msg_id: i64, ping_id: i64) -> Vec<u8> {
    enums::Pong::Pong(types::Pong { msg_id: req_msg_id, ping_id }).to_bytes()
}

fn ack_body(msg_ids: &[i64]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(0x62d6b459u32.to_le_bytes());
    body.extend(0x1cb5c415u32.to_le_bytes());
    body.extend((msg_ids.len() as u32).to_le_bytes());
    for id in msg_ids {
        body.extend(id.to_le_bytes());
    }
    body
}

fn bad_msg_notification(bad_msg_id: i64, error_code: i32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(0xa7eff811u32.to_le_bytes());
    body.extend(bad_msg_id.to_le_bytes());
    body.extend(0i32.to_le_bytes());
    body.extend(error_code.to_le_bytes());
    body
}

fn bad_server_salt(bad_msg_id: i64, new_salt: i64) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(0xedab447bu32.to_le_bytes());
    body.extend(bad_msg_id.to_le_bytes());
    body.extend(0i32.to_le_bytes());
    body.extend(48i32.to_le_bytes());
    body.extend(new_salt.to_le_bytes());
    body
}

fn sample_message(id: i32, text: &str) -> enums::Message {
    enums::Message::Message(types::Message {
        out: false,
        id,
        from_id: Some(enums::Peer::User(types::PeerUser { user_id: 7 })),
        peer_id: enums::Peer::Chat(types::PeerChat { chat_id: 11 }),
        date: 1_700_000_000,
        message: text.to_string(),
        edit_date: None,
    })
}

fn edit_topic_request() -> functions::channels::EditForumTopic {
    functions::channels::EditForumTopic {
        channel: enums::InputChannel::Channel(types::InputChannel {
            channel_id: 99,
            access_hash: 1234,
        }),
        topic_id: 5,
        title: Some("renamed".to_string()),
        icon_emoji_id: None,
        closed: None,
        hidden: None,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invoke_decodes_the_returned_updates() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        assert_eq!(
            req.constructor_id(),
            functions::channels::EditForumTopic::CONSTRUCTOR_ID
        );
        let updates = enums::Updates::Updates(types::Updates {
            updates: vec![enums::Update::NewMessage(types::UpdateNewMessage {
                message: sample_message(42, "topic renamed"),
                pts: 1,
                pts_count: 1,
            })],
            users: vec![enums::User::User(types::User {
                id: 7,
                access_hash: Some(555),
                first_name: Some("Ada".to_string()),
                last_name: None,
                username: None,
            })],
            chats: vec![],
            date: 1_700_000_000,
            seq: 1,
        });
        conn.send_body(&rpc_result(req.msg_id, &updates.to_bytes())).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let updates = sender.invoke(&edit_topic_request()).await.unwrap();

    let found = first_message_update(updates).expect("one message update expected");
    assert_eq!(found.message.id(), 42);
    assert!(found.users.contains_key(&7));
    server.await.unwrap();
}

#[tokio::test]
async fn rpc_error_carries_code_name_and_value() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        conn.send_body(&rpc_result(req.msg_id, &rpc_error(420, "FLOOD_WAIT_31"))).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let err = sender.invoke(&edit_topic_request()).await.unwrap_err();

    assert!(err.is("FLOOD_WAIT"));
    assert_eq!(err.flood_wait_seconds(), Some(31));
    match err {
        InvocationError::Rpc(e) => {
            assert_eq!(e.code, 420);
            assert_eq!(e.name, "FLOOD_WAIT");
            assert_eq!(e.value, Some(31));
        }
        other => panic!("expected an rpc error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn ping_is_answered_by_a_pong_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        assert_eq!(req.constructor_id(), functions::Ping::CONSTRUCTOR_ID);
        let ping_id = i64::from_le_bytes(req.body[4..12].try_into().unwrap());
        conn.send_body(&pong_body(req.msg_id, ping_id)).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let enums::Pong::Pong(pong) = sender.invoke(&functions::Ping { ping_id: 9000 }).await.unwrap();
    assert_eq!(pong.ping_id, 9000);
    server.await.unwrap();
}

#[tokio::test]
async fn duplicate_answers_resolve_exactly_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        let ping_id = i64::from_le_bytes(req.body[4..12].try_into().unwrap());
        // the retransmit must be discarded without touching later calls
        conn.send_body(&pong_body(req.msg_id, ping_id)).await;
        conn.send_body(&pong_body(req.msg_id, ping_id)).await;

        let req = conn.recv().await;
        let ping_id = i64::from_le_bytes(req.body[4..12].try_into().unwrap());
        conn.send_body(&pong_body(req.msg_id, ping_id)).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let enums::Pong::Pong(first) = sender.invoke(&functions::Ping { ping_id: 1 }).await.unwrap();
    assert_eq!(first.ping_id, 1);
    let enums::Pong::Pong(second) = sender.invoke(&functions::Ping { ping_id: 2 }).await.unwrap();
    assert_eq!(second.ping_id, 2);
    server.await.unwrap();
}

#[tokio::test]
async fn timeout_never_fires_before_the_deadline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let _ = conn.recv().await;
        // never answer; the follow-up frame must be the drop request
        let drop_req = conn.recv().await;
        assert_eq!(drop_req.constructor_id(), functions::RpcDropAnswer::CONSTRUCTOR_ID);
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let started = Instant::now();
    let err = sender
        .invoke_with_timeout(&functions::Ping { ping_id: 3 }, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::Timeout));
    assert!(started.elapsed() >= Duration::from_millis(200));
    server.await.unwrap();
}

#[tokio::test]
async fn dropping_a_call_sends_rpc_drop_answer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        assert_eq!(req.constructor_id(), functions::Ping::CONSTRUCTOR_ID);
        let drop_req = conn.recv().await;
        assert_eq!(drop_req.constructor_id(), functions::RpcDropAnswer::CONSTRUCTOR_ID);
        let dropped = i64::from_le_bytes(drop_req.body[4..12].try_into().unwrap());
        assert_eq!(dropped, req.msg_id);
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    {
        let fut = sender.invoke(&functions::Ping { ping_id: 4 });
        tokio::pin!(fut);
        tokio::select! {
            _ = &mut fut => panic!("call must still be pending"),
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
        // fut drops here, cancelling the call
    }
    server.await.unwrap();
}

#[tokio::test]
async fn bad_server_salt_rotates_and_resends() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    const NEW_SALT: i64 = 0x5eed_5a17_5eed_5a17;

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let first = conn.recv().await;
        assert_eq!(first.salt, FIRST_SALT);
        conn.send_body(&bad_server_salt(first.msg_id, NEW_SALT)).await;

        let second = conn.recv().await;
        assert_eq!(second.salt, NEW_SALT, "resend must carry the new salt");
        assert_eq!(second.body, first.body, "resend must repeat the request");
        assert_ne!(second.msg_id, first.msg_id, "resend must be re-keyed");
        conn.salt = NEW_SALT;
        let ping_id = i64::from_le_bytes(second.body[4..12].try_into().unwrap());
        conn.send_body(&pong_body(second.msg_id, ping_id)).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let enums::Pong::Pong(pong) = sender.invoke(&functions::Ping { ping_id: 5 }).await.unwrap();
    assert_eq!(pong.ping_id, 5);
    server.await.unwrap();
}

#[tokio::test]
async fn resend_budget_exhausts_to_connection_lost() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        conn.send_body(&bad_server_salt(req.msg_id, 77)).await;
        // keep the socket open so the failure is the budget, not the link
        tokio::time::sleep(Duration::from_secs(1)).await;
    });

    let mut config = test_config(addr);
    config.retry_limit = 0;
    let sender = Sender::connect(config).await.unwrap();
    let err = sender.invoke(&functions::Ping { ping_id: 6 }).await.unwrap_err();
    assert!(matches!(err, InvocationError::ConnectionLost));
    server.abort();
}

#[tokio::test]
async fn reconnect_resends_pending_calls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let first = conn.recv().await;
        let (session_id, salt) = (conn.session_id, conn.salt);
        drop(conn);

        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = ServerConn::adopt(stream, session_id, salt);
        let resent = conn.recv().await;
        assert_eq!(resent.body, first.body);
        let ping_id = i64::from_le_bytes(resent.body[4..12].try_into().unwrap());
        conn.send_body(&pong_body(resent.msg_id, ping_id)).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let enums::Pong::Pong(pong) = sender.invoke(&functions::Ping { ping_id: 8 }).await.unwrap();
    assert_eq!(pong.ping_id, 8);
    server.await.unwrap();
}

#[tokio::test]
async fn acknowledged_calls_are_not_resent_after_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        conn.send_body(&ack_body(&[req.msg_id])).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let (session_id, salt) = (conn.session_id, conn.salt);
        drop(conn);

        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = ServerConn::adopt(stream, session_id, salt);
        let quiet = tokio::time::timeout(Duration::from_millis(300), conn.recv()).await;
        assert!(quiet.is_err(), "acknowledged call must not be resent");

        // the server still owes an answer on the original msg_id
        let ping_id = 10i64;
        conn.send_body(&pong_body(req.msg_id, ping_id)).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let enums::Pong::Pong(pong) = sender.invoke(&functions::Ping { ping_id: 10 }).await.unwrap();
    assert_eq!(pong.ping_id, 10);
    server.await.unwrap();
}

#[tokio::test]
async fn retry_bound_fails_at_exactly_the_limit() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let _ = conn.recv().await;
        drop(conn);

        // one allowed failure means no resend may reach the new connection
        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = ServerConn::adopt(stream, 0, FIRST_SALT);
        let quiet = tokio::time::timeout(Duration::from_millis(300), conn.recv()).await;
        assert!(quiet.is_err(), "call over budget must not be resent");
    });

    let mut config = test_config(addr);
    config.retry_limit = 1;
    let sender = Sender::connect(config).await.unwrap();
    let err = sender.invoke(&functions::Ping { ping_id: 77 }).await.unwrap_err();
    assert!(matches!(err, InvocationError::ConnectionLost));
    server.await.unwrap();
}

#[tokio::test]
async fn repeated_integrity_failures_reset_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let first = conn.recv().await;
        let old_session_id = conn.session_id;

        // undecryptable frames: right shape, wrong key id
        conn.send_raw(&[0u8; 56]).await;
        conn.send_raw(&[0u8; 56]).await;

        let mut conn = ServerConn::accept(&listener).await;
        let resent = conn.recv().await;
        assert_ne!(conn.session_id, old_session_id, "session id must be replaced");
        assert_eq!(resent.body, first.body, "the pending call must be resent");
        let ping_id = i64::from_le_bytes(resent.body[4..12].try_into().unwrap());
        conn.send_body(&pong_body(resent.msg_id, ping_id)).await;
    });

    let mut config = test_config(addr);
    config.escalation_threshold = 2;
    let sender = Sender::connect(config).await.unwrap();
    let enums::Pong::Pong(pong) = sender.invoke(&functions::Ping { ping_id: 13 }).await.unwrap();
    assert_eq!(pong.ping_id, 13);
    server.await.unwrap();
}

#[tokio::test]
async fn unreplayable_bad_msg_notification_fails_the_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        // 32 = msg_seqno too low, not a clock-skew code
        conn.send_body(&bad_msg_notification(req.msg_id, 32)).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let err = sender.invoke(&functions::Ping { ping_id: 14 }).await.unwrap_err();
    assert!(matches!(err, InvocationError::BadMessage { code: 32 }));
    server.await.unwrap();
}

#[tokio::test]
async fn pushed_updates_reach_every_handler() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut conn = ServerConn::accept(&listener).await;
        let req = conn.recv().await;
        let ping_id = i64::from_le_bytes(req.body[4..12].try_into().unwrap());
        conn.send_body(&pong_body(req.msg_id, ping_id)).await;

        let push = enums::Updates::Short(types::UpdateShort {
            update: enums::Update::NewMessage(types::UpdateNewMessage {
                message: sample_message(77, "hello"),
                pts: 2,
                pts_count: 1,
            }),
            date: 1_700_000_001,
        });
        conn.send_body(&push.to_bytes()).await;

        let req = conn.recv().await;
        let ping_id = i64::from_le_bytes(req.body[4..12].try_into().unwrap());
        conn.send_body(&pong_body(req.msg_id, ping_id)).await;
    });

    let sender = Sender::connect(test_config(addr)).await.unwrap();
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

    // a failing handler must not shadow the ones after it
    sender.subscribe(|_| Err(tgwire_sender::HandlerError("nope".to_string())));
    sender.subscribe(move |update| {
        let _ = seen_tx.send(update.clone());
        Ok(())
    });

    // the first ping teaches the server our session id
    sender.invoke(&functions::Ping { ping_id: 11 }).await.unwrap();

    let update = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("update not dispatched in time")
        .expect("dispatcher dropped");
    match update {
        Update::NewMessage(message) => assert_eq!(message.id(), 77),
        other => panic!("expected a new message, got {other:?}"),
    }

    // the connection stays usable after dispatch
    sender.invoke(&functions::Ping { ping_id: 12 }).await.unwrap();
    server.await.unwrap();
}
