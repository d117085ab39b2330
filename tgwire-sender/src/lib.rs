//! Async MTProto invocation core.
//!
//! A [`Sender`] owns one encrypted connection and multiplexes any number of
//! concurrent RPC calls over it. A single reader task decrypts incoming
//! frames, classifies their envelopes and resolves the matching pending
//! call; updates go to an [`UpdateDispatcher`].
//!
//! ```no_run
//! use tgwire_sender::{Config, Sender};
//! use tgwire_tl::schema::functions;
//!
//! # async fn run(auth_key: [u8; 256]) -> Result<(), tgwire_sender::InvocationError> {
//! let config = Config {
//!     addr: "149.154.167.51:443".into(),
//!     auth_key,
//!     ..Config::default()
//! };
//! let sender = Sender::connect(config).await?;
//! let pong = sender.invoke(&functions::Ping { ping_id: 42 }).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod errors;
mod pending;
pub mod update;

pub use dispatcher::{HandlerError, UpdateDispatcher};
pub use errors::{InvocationError, RpcError};
pub use update::{MessageUpdate, Update, all_message_updates, first_message_update};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::{Duration, Instant};

use tgwire_mtproto::transport::Codec;
use tgwire_mtproto::{Envelope, Framing, MsgId, RpcOutcome, Session, UnwrapError};
use tgwire_tl::schema::functions;
use tgwire_tl::{Deserializable, RemoteCall, Serializable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::pending::{CallState, PendingCall, PendingMap};

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for [`Sender::connect`].
#[derive(Clone)]
pub struct Config {
    /// Server address, `host:port`.
    pub addr: String,
    /// Established 256-byte auth key.
    pub auth_key: [u8; 256],
    /// Initial server salt.
    pub first_salt: i64,
    /// Which transport framing to speak (default: Abridged).
    pub framing: Framing,
    /// Deadline applied by [`Sender::invoke`] (default: 30 s).
    pub default_timeout: Duration,
    /// How many times one call may be re-sent (default: 3).
    pub retry_limit: u32,
    /// Reconnection attempts after a lost connection (default: 5).
    pub reconnect_attempts: u32,
    /// Delay before each reconnection attempt (default: 1 s).
    pub reconnect_delay: Duration,
    /// Consecutive integrity failures that trigger session invalidation
    /// (default: 3).
    pub escalation_threshold: u32,
    /// How long a rotated-out server salt stays accepted (default: 30 min).
    pub salt_grace: Duration,
    /// Keepalive ping interval, `None` to disable (default: 60 s).
    pub ping_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: String::new(),
            auth_key: [0u8; 256],
            first_salt: 0,
            framing: Framing::Abridged,
            default_timeout: Duration::from_secs(30),
            retry_limit: 3,
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            escalation_threshold: 3,
            salt_grace: Duration::from_secs(30 * 60),
            ping_interval: Some(Duration::from_secs(60)),
        }
    }
}

// ─── Sender ───────────────────────────────────────────────────────────────────

struct WriteState {
    stream: OwnedWriteHalf,
    codec: Codec,
}

struct SenderInner {
    config: Config,
    session: StdMutex<Session>,
    writer: Mutex<Option<WriteState>>,
    pending: PendingMap,
    dispatcher: UpdateDispatcher,
    cancel_tx: mpsc::UnboundedSender<i64>,
    last_frame: StdMutex<Instant>,
    closed: AtomicBool,
}

/// One encrypted connection multiplexing concurrent RPC calls.
///
/// Cheap to clone; all clones share the connection.
#[derive(Clone)]
pub struct Sender {
    inner: Arc<SenderInner>,
}

impl Sender {
    /// Open the TCP stream, install the session and spawn the reader task.
    pub async fn connect(config: Config) -> Result<Self, InvocationError> {
        let stream = TcpStream::connect(&config.addr).await?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();

        let mut session = Session::new(config.auth_key, config.first_salt);
        session.set_salt_grace(config.salt_grace);

        let (cancel_tx, cancel_rx) = mpsc::unbounded_channel();
        let ping_interval = config.ping_interval;
        let framing = config.framing;

        let inner = Arc::new(SenderInner {
            config,
            session: StdMutex::new(session),
            writer: Mutex::new(Some(WriteState { stream: write, codec: framing.codec() })),
            pending: PendingMap::default(),
            dispatcher: UpdateDispatcher::default(),
            cancel_tx,
            last_frame: StdMutex::new(Instant::now()),
            closed: AtomicBool::new(false),
        });

        tokio::spawn(read_loop(Arc::downgrade(&inner), read));
        tokio::spawn(cancel_loop(Arc::downgrade(&inner), cancel_rx));
        if let Some(interval) = ping_interval {
            tokio::spawn(keepalive_loop(Arc::downgrade(&inner), interval));
        }

        Ok(Self { inner })
    }

    /// Invoke an RPC call with the configured default timeout.
    pub async fn invoke<R: RemoteCall>(&self, request: &R) -> Result<R::Return, InvocationError> {
        self.invoke_with_timeout(request, self.inner.config.default_timeout).await
    }

    /// Invoke an RPC call, failing with [`InvocationError::Timeout`] once
    /// `timeout` has elapsed. The timeout never fires early.
    pub async fn invoke_with_timeout<R: RemoteCall>(
        &self,
        request: &R,
        timeout: Duration,
    ) -> Result<R::Return, InvocationError> {
        let (rx, guard) = self.send_call(request.to_bytes()).await?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(bytes))) => {
                guard.disarm();
                R::Return::from_bytes(&bytes).map_err(Into::into)
            }
            Ok(Ok(Err(e))) => {
                guard.disarm();
                Err(e)
            }
            // the result slot was withdrawn without an answer
            Ok(Err(_)) => {
                guard.disarm();
                Err(InvocationError::Cancelled)
            }
            // guard drops here and withdraws the pending entry
            Err(_) => Err(InvocationError::Timeout),
        }
    }

    /// Register a handler for pushed updates. Handlers run in subscription
    /// order; a failing or panicking handler never affects the others.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&Update) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(handler);
    }

    /// Whether the connection has been torn down for good.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Register the call before the frame hits the wire, then send it.
    async fn send_call(
        &self,
        body: Vec<u8>,
    ) -> Result<
        (oneshot::Receiver<Result<Vec<u8>, InvocationError>>, CancelGuard),
        InvocationError,
    > {
        let (tx, rx) = oneshot::channel();
        let (wire, msg_id) = {
            let mut session = self.inner.session.lock().unwrap();
            session.wrap(&body)
        };

        let key_cell = Arc::new(StdMutex::new(msg_id.0));
        self.inner.pending.register(
            msg_id.0,
            PendingCall {
                request: body,
                tx,
                state: CallState::Sent,
                resends: 0,
                created_at: Instant::now(),
                key_cell: Arc::clone(&key_cell),
            },
        );
        let guard = CancelGuard {
            inner: Arc::clone(&self.inner),
            key_cell,
            armed: true,
        };

        if let Err(e) = send_frame(&self.inner, &wire).await {
            // withdraw silently, no rpc_drop_answer for a frame never sent
            let _ = self.inner.pending.take(msg_id.0);
            guard.disarm();
            return Err(e);
        }
        Ok((rx, guard))
    }
}

// ─── Cancellation ─────────────────────────────────────────────────────────────

/// Removes the pending entry and queues a best-effort `rpc_drop_answer` when
/// the invoke future is dropped before resolution.
struct CancelGuard {
    inner: Arc<SenderInner>,
    key_cell: Arc<StdMutex<i64>>,
    armed: bool,
}

impl CancelGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let key = *self.key_cell.lock().unwrap();
        if self.inner.pending.take(key).is_some() {
            log::debug!("call {key} cancelled before resolution");
            let _ = self.inner.cancel_tx.send(key);
        }
    }
}

async fn cancel_loop(weak: Weak<SenderInner>, mut rx: mpsc::UnboundedReceiver<i64>) {
    while let Some(msg_id) = rx.recv().await {
        let Some(inner) = weak.upgrade() else { break };
        let body = functions::RpcDropAnswer { req_msg_id: msg_id }.to_bytes();
        let wire = {
            let mut session = inner.session.lock().unwrap();
            session.wrap(&body).0
        };
        if let Err(e) = send_frame(&inner, &wire).await {
            log::debug!("rpc_drop_answer for {msg_id} not sent: {e}");
        }
    }
}

// ─── Writing ──────────────────────────────────────────────────────────────────

async fn send_frame(inner: &SenderInner, payload: &[u8]) -> Result<(), InvocationError> {
    let mut guard = inner.writer.lock().await;
    match guard.as_mut() {
        Some(w) => {
            let mut out = Vec::with_capacity(payload.len() + 16);
            w.codec.pack(payload, &mut out);
            w.stream.write_all(&out).await.map_err(InvocationError::Io)
        }
        None => Err(InvocationError::ConnectionLost),
    }
}

// ─── Reader task ──────────────────────────────────────────────────────────────

async fn read_loop(weak: Weak<SenderInner>, mut read: OwnedReadHalf) {
    let mut codec = match weak.upgrade() {
        Some(inner) => inner.config.framing.codec(),
        None => return,
    };
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; 8192];
    let mut integrity_failures = 0u32;

    loop {
        // drain complete frames before reading more
        let mut broken = false;
        loop {
            let Some(inner) = weak.upgrade() else { return };
            match codec.unpack(&mut buf) {
                Ok(Some(frame)) => {
                    *inner.last_frame.lock().unwrap() = Instant::now();
                    if handle_frame(&inner, &frame, &mut integrity_failures).await {
                        log::warn!("integrity failures over threshold, invalidating session");
                        inner.session.lock().unwrap().reset();
                        integrity_failures = 0;
                        broken = true;
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("transport failure: {e}");
                    broken = true;
                    break;
                }
            }
        }

        if !broken {
            match read.read(&mut chunk).await {
                Ok(0) => {
                    log::info!("server closed the connection");
                    broken = true;
                }
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    continue;
                }
                Err(e) => {
                    log::warn!("read failed: {e}");
                    broken = true;
                }
            }
        }

        if broken {
            let Some(inner) = weak.upgrade() else { return };
            match reconnect(&inner).await {
                Some(new_read) => {
                    read = new_read;
                    codec = inner.config.framing.codec();
                    buf.clear();
                }
                None => {
                    inner.pending.fail_all();
                    inner.closed.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }
}

/// Returns `true` when integrity failures crossed the escalation threshold.
async fn handle_frame(inner: &Arc<SenderInner>, frame: &[u8], failures: &mut u32) -> bool {
    let plain = {
        let session = inner.session.lock().unwrap();
        session.unwrap(frame)
    };
    let plain = match plain {
        Ok(p) => {
            *failures = 0;
            p
        }
        Err(UnwrapError::IntegrityFailure(e)) => {
            *failures += 1;
            log::warn!("dropping undecryptable frame ({e}), {} in a row", *failures);
            return *failures >= inner.config.escalation_threshold;
        }
        Err(e) => {
            log::warn!("dropping frame: {e}");
            return false;
        }
    };

    match Envelope::from_bytes(&plain.body) {
        Ok(envelope) => handle_envelope(inner, envelope, plain.msg_id).await,
        Err(e) => log::warn!("dropping malformed envelope: {e}"),
    }
    false
}

async fn handle_envelope(inner: &Arc<SenderInner>, envelope: Envelope, server_msg_id: MsgId) {
    let mut queue = VecDeque::from([envelope]);
    while let Some(envelope) = queue.pop_front() {
        match envelope {
            Envelope::Container(entries) => {
                queue.extend(entries.into_iter().map(|(_, e)| e));
            }
            Envelope::RpcResult { req_msg_id, outcome } => {
                let result = match outcome {
                    RpcOutcome::Ok(bytes) => Ok(bytes),
                    RpcOutcome::Error { code, message } => {
                        Err(InvocationError::Rpc(RpcError::from_wire(code, &message)))
                    }
                };
                if !inner.pending.resolve(req_msg_id.0, result) {
                    log::debug!("late or duplicate answer for {req_msg_id}, discarded");
                }
            }
            Envelope::Ack(ids) => {
                for id in ids {
                    inner.pending.acknowledge(id.0);
                }
            }
            Envelope::BadServerSalt { bad_msg_id, new_salt } => {
                inner.session.lock().unwrap().rotate_salt(new_salt);
                resend_one(inner, bad_msg_id.0).await;
            }
            Envelope::BadMsgNotification { bad_msg_id, error_code } => {
                if error_code == 16 || error_code == 17 {
                    inner.session.lock().unwrap().adjust_time_offset(server_msg_id);
                    resend_one(inner, bad_msg_id.0).await;
                } else {
                    log::warn!("bad_msg_notification code {error_code} for {bad_msg_id}");
                    let _ = inner
                        .pending
                        .resolve(bad_msg_id.0, Err(InvocationError::BadMessage { code: error_code }));
                }
            }
            Envelope::NewSession { server_salt } => {
                inner.session.lock().unwrap().rotate_salt(server_salt);
            }
            Envelope::Pong { msg_id, ping_id } => {
                // pongs answer pings directly, outside rpc_result
                let mut bytes = Vec::with_capacity(20);
                bytes.extend(0x347773c5u32.to_le_bytes());
                bytes.extend(msg_id.0.to_le_bytes());
                bytes.extend(ping_id.to_le_bytes());
                if !inner.pending.resolve(msg_id.0, Ok(bytes)) {
                    log::debug!("pong for unknown msg_id {msg_id}, discarded");
                }
            }
            Envelope::Updates(raw) => {
                for update in update::parse_updates(&raw) {
                    inner.dispatcher.dispatch(&update);
                }
            }
        }
    }
}

// ─── Reconnection and resend ─────────────────────────────────────────────────

async fn resend_one(inner: &Arc<SenderInner>, old_key: i64) {
    let Some(call) = inner.pending.take(old_key) else {
        log::debug!("resend requested for unknown call {old_key}");
        return;
    };
    resend(inner, call).await;
}

async fn resend(inner: &Arc<SenderInner>, mut call: PendingCall) {
    // the failure that triggered this resend counts against the budget
    if call.resends + 1 >= inner.config.retry_limit {
        log::warn!(
            "giving up on call after {} resends, {:.1}s since first send",
            call.resends,
            call.created_at.elapsed().as_secs_f64()
        );
        let _ = call.tx.send(Err(InvocationError::ConnectionLost));
        return;
    }
    call.resends += 1;
    call.state = CallState::Sent;
    let (wire, msg_id) = {
        let mut session = inner.session.lock().unwrap();
        session.wrap(&call.request)
    };
    *call.key_cell.lock().unwrap() = msg_id.0;
    inner.pending.register(msg_id.0, call);
    if let Err(e) = send_frame(inner, &wire).await {
        log::warn!("resend of {msg_id} failed: {e}");
    }
}

async fn reconnect(inner: &Arc<SenderInner>) -> Option<OwnedReadHalf> {
    // fail sends fast while we are down
    *inner.writer.lock().await = None;

    for attempt in 1..=inner.config.reconnect_attempts {
        tokio::time::sleep(inner.config.reconnect_delay).await;
        match TcpStream::connect(&inner.config.addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                let (read, write) = stream.into_split();
                *inner.writer.lock().await =
                    Some(WriteState { stream: write, codec: inner.config.framing.codec() });
                log::info!("reconnected to {} on attempt {attempt}", inner.config.addr);
                resend_unacknowledged(inner).await;
                return Some(read);
            }
            Err(e) => {
                log::warn!(
                    "reconnect attempt {attempt}/{} failed: {e}",
                    inner.config.reconnect_attempts
                );
            }
        }
    }
    None
}

async fn resend_unacknowledged(inner: &Arc<SenderInner>) {
    // acknowledged calls stay registered; the server still owes an answer
    for (_, call) in inner.pending.take_unacknowledged() {
        resend(inner, call).await;
    }
}

// ─── Keepalive ────────────────────────────────────────────────────────────────

async fn keepalive_loop(weak: Weak<SenderInner>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(inner) = weak.upgrade() else { return };
        if inner.closed.load(Ordering::SeqCst) {
            return;
        }
        if inner.last_frame.lock().unwrap().elapsed() < interval {
            continue;
        }
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).expect("getrandom failed");
        let ping = functions::Ping { ping_id: i64::from_le_bytes(rnd) };
        let sender = Sender { inner };
        match sender.invoke_with_timeout(&ping, Duration::from_secs(10)).await {
            Ok(_) => log::debug!("keepalive pong received"),
            Err(e) => log::warn!("keepalive ping failed: {e}"),
        }
    }
}
