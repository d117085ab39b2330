//! MTProto 2.0 session state.
//!
//! A [`Session`] owns the auth key plus the per-connection counters (session
//! id, sequence, last message id, server salt) and turns TL bodies into
//! encrypted wire frames and back.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tgwire_crypto::{AuthKey, CryptoError, Side, decrypt_message, encrypt_message};

use crate::message::{MsgId, PlainMessage};

/// Default window for accepting a rotated-out server salt.
pub const DEFAULT_SALT_GRACE: Duration = Duration::from_secs(30 * 60);
/// Default tolerated distance between a server msg_id's embedded time and
/// corrected local time.
pub const DEFAULT_SKEW_WINDOW: Duration = Duration::from_secs(300);

/// Errors that can occur when unwrapping a server frame.
#[derive(Debug)]
pub enum UnwrapError {
    /// The crypto layer rejected the frame.
    IntegrityFailure(CryptoError),
    /// The decrypted inner message was too short for a valid header.
    FrameTooShort,
    /// Session-id mismatch (possible replay or wrong connection).
    SessionMismatch,
    /// The msg_id-embedded server time is too far from corrected local time.
    ClockSkew {
        /// The offending identifier.
        msg_id: MsgId,
    },
}

impl std::fmt::Display for UnwrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IntegrityFailure(e) => write!(f, "integrity failure: {e}"),
            Self::FrameTooShort => write!(f, "inner plaintext too short"),
            Self::SessionMismatch => write!(f, "session_id mismatch"),
            Self::ClockSkew { msg_id } => write!(f, "msg_id {msg_id} outside skew window"),
        }
    }
}
impl std::error::Error for UnwrapError {}

impl From<CryptoError> for UnwrapError {
    fn from(e: CryptoError) -> Self {
        Self::IntegrityFailure(e)
    }
}

/// MTProto 2.0 session state for the client side of a connection.
///
/// Use [`Session::wrap`] to encrypt outgoing requests and [`Session::unwrap`]
/// to decrypt incoming server frames. All state lives behind whatever single
/// lock the caller wraps the session in; the type itself is not synchronized.
pub struct Session {
    auth_key: AuthKey,
    session_id: i64,
    sequence: i32,
    last_msg_id: i64,
    salt: i64,
    previous_salt: Option<(i64, Instant)>,
    time_offset: i32,
    salt_grace: Duration,
    skew_window: Duration,
}

impl Session {
    /// Create a fresh session over an established auth key.
    pub fn new(auth_key: [u8; 256], first_salt: i64) -> Self {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).expect("getrandom failed");
        Self {
            auth_key: AuthKey::from_bytes(auth_key),
            session_id: i64::from_le_bytes(rnd),
            sequence: 0,
            last_msg_id: 0,
            salt: first_salt,
            previous_salt: None,
            time_offset: 0,
            salt_grace: DEFAULT_SALT_GRACE,
            skew_window: DEFAULT_SKEW_WINDOW,
        }
    }

    /// Override the salt grace window.
    pub fn set_salt_grace(&mut self, grace: Duration) {
        self.salt_grace = grace;
    }

    /// Override the clock-skew tolerance used by [`Session::unwrap`].
    pub fn set_skew_window(&mut self, window: Duration) {
        self.skew_window = window;
    }

    /// The current session identifier.
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// The salt currently used for outgoing frames.
    pub fn salt(&self) -> i64 {
        self.salt
    }

    /// Current clock correction in seconds.
    pub fn time_offset(&self) -> i32 {
        self.time_offset
    }

    fn now_secs(&self) -> i64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        now.as_secs() as i64 + i64::from(self.time_offset)
    }

    /// Compute the next message id from corrected server time.
    ///
    /// Strictly monotonic; the low two bits stay `00` for client messages.
    fn next_msg_id(&mut self) -> MsgId {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let secs = (now.as_secs() as i32).wrapping_add(self.time_offset) as u32 as u64;
        let nanos = u64::from(now.subsec_nanos());
        let mut id = ((secs << 32) | (nanos << 2)) as i64;
        if self.last_msg_id >= id {
            id = self.last_msg_id + 4;
        }
        self.last_msg_id = id;
        MsgId(id)
    }

    /// Next content-related seq_no (odd) and advance the counter.
    fn next_seq_no(&mut self) -> i32 {
        let n = self.sequence * 2 + 1;
        self.sequence += 1;
        n
    }

    /// Seq_no for a content-unrelated message (even, does not advance).
    fn next_seq_no_unrelated(&self) -> i32 {
        self.sequence * 2
    }

    fn build_inner(&self, msg_id: MsgId, seq_no: i32, body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 8 + 4 + 4 + body.len());
        buf.extend(self.salt.to_le_bytes());
        buf.extend(self.session_id.to_le_bytes());
        buf.extend(msg_id.0.to_le_bytes());
        buf.extend(seq_no.to_le_bytes());
        buf.extend((body.len() as u32).to_le_bytes());
        buf.extend_from_slice(body);
        buf
    }

    /// Encrypt a content-related TL body into a wire-ready frame.
    ///
    /// Returns the frame plus the msg_id allocated for it, so the caller can
    /// register a pending reply slot before sending.
    pub fn wrap(&mut self, body: &[u8]) -> (Vec<u8>, MsgId) {
        let msg_id = self.next_msg_id();
        let seq_no = self.next_seq_no();
        let inner = self.build_inner(msg_id, seq_no, body);
        (encrypt_message(&inner, &self.auth_key, Side::Client), msg_id)
    }

    /// Like [`Session::wrap`] for content-unrelated messages (acks, pings).
    pub fn wrap_unrelated(&mut self, body: &[u8]) -> (Vec<u8>, MsgId) {
        let msg_id = self.next_msg_id();
        let seq_no = self.next_seq_no_unrelated();
        let inner = self.build_inner(msg_id, seq_no, body);
        (encrypt_message(&inner, &self.auth_key, Side::Client), msg_id)
    }

    /// Decrypt a server frame and validate its header.
    pub fn unwrap(&self, frame: &[u8]) -> Result<PlainMessage, UnwrapError> {
        let plaintext = decrypt_message(frame, &self.auth_key, Side::Server)?;

        // inner: salt(8) + session_id(8) + msg_id(8) + seq_no(4) + len(4) + body
        if plaintext.len() < 32 {
            return Err(UnwrapError::FrameTooShort);
        }
        let salt = i64::from_le_bytes(plaintext[..8].try_into().unwrap());
        let session_id = i64::from_le_bytes(plaintext[8..16].try_into().unwrap());
        let msg_id = MsgId(i64::from_le_bytes(plaintext[16..24].try_into().unwrap()));
        let seq_no = i32::from_le_bytes(plaintext[24..28].try_into().unwrap());
        let body_len = u32::from_le_bytes(plaintext[28..32].try_into().unwrap()) as usize;

        if session_id != self.session_id {
            return Err(UnwrapError::SessionMismatch);
        }
        if body_len > plaintext.len() - 32 {
            return Err(UnwrapError::FrameTooShort);
        }

        let skew = (msg_id.unix_secs() - self.now_secs()).unsigned_abs();
        if skew > self.skew_window.as_secs() {
            return Err(UnwrapError::ClockSkew { msg_id });
        }

        let body = plaintext[32..32 + body_len].to_vec();
        Ok(PlainMessage { salt, session_id, msg_id, seq_no, body })
    }

    // ─── Salt and clock management ───────────────────────────────────────────

    /// Adopt `new_salt` for outgoing frames, keeping the old salt accepted
    /// for the grace window. Rotating to the current salt is a no-op.
    pub fn rotate_salt(&mut self, new_salt: i64) {
        if new_salt == self.salt {
            return;
        }
        log::debug!("rotating server salt {} -> {}", self.salt, new_salt);
        self.previous_salt = Some((self.salt, Instant::now() + self.salt_grace));
        self.salt = new_salt;
    }

    /// Whether `salt` is the current salt or a rotated-out one still inside
    /// its grace window.
    pub fn accepts_salt(&mut self, salt: i64) -> bool {
        if salt == self.salt {
            return true;
        }
        match self.previous_salt {
            Some((prev, deadline)) if Instant::now() < deadline => salt == prev,
            Some(_) => {
                self.previous_salt = None;
                false
            }
            None => false,
        }
    }

    /// Correct the local clock from a server message id, as directed by a
    /// bad_msg_notification with error code 16 or 17.
    pub fn adjust_time_offset(&mut self, server_msg_id: MsgId) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        self.time_offset = (server_msg_id.unix_secs() - now) as i32;
        log::info!("time offset adjusted to {}s", self.time_offset);
    }

    /// Invalidate the session: fresh random session id, counters reset, auth
    /// key and salt retained.
    pub fn reset(&mut self) {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).expect("getrandom failed");
        self.session_id = i64::from_le_bytes(rnd);
        self.sequence = 0;
        self.last_msg_id = 0;
        log::info!("session reset, new session_id {}", self.session_id);
    }

    /// Return the auth key bytes (for persistence).
    pub fn auth_key_bytes(&self) -> [u8; 256] {
        self.auth_key.to_bytes()
    }
}
