//! Cryptographic primitives for MTProto 2.0.
//!
//! Provides:
//! - AES-256-IGE encryption/decryption
//! - SHA-1 / SHA-256 hash macros
//! - [`AuthKey`] — 256-byte long-lived key with its derived identifier
//! - MTProto 2.0 message encryption / decryption, parameterized by [`Side`]
//!   so the same code can act as either peer

#![deny(unsafe_code)]

mod auth_key;
pub mod ige;
mod sha;

pub use auth_key::AuthKey;

// ─── MTProto 2.0 encrypt / decrypt ───────────────────────────────────────────

/// Errors from [`decrypt_message`].
#[derive(Clone, Debug, PartialEq)]
pub enum CryptoError {
    /// Ciphertext shorter than the 24-byte header or not block-aligned.
    BufferTooSmall,
    /// The `auth_key_id` in the ciphertext does not match our key.
    AuthKeyMismatch,
    /// The `msg_key` in the ciphertext does not match our computed value.
    MessageKeyMismatch,
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "ciphertext too short or misaligned"),
            Self::AuthKeyMismatch => write!(f, "auth_key_id mismatch"),
            Self::MessageKeyMismatch => write!(f, "msg_key mismatch"),
        }
    }
}
impl std::error::Error for CryptoError {}

/// Which peer produced a message. Key derivation mixes a side-dependent
/// offset into the auth key, so the two directions never share key material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    fn x(self) -> usize {
        match self {
            Side::Client => 0,
            Side::Server => 8,
        }
    }

    /// The opposite peer.
    pub fn other(self) -> Side {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }
}

fn calc_key(auth_key: &AuthKey, msg_key: &[u8; 16], side: Side) -> ([u8; 32], [u8; 32]) {
    let x = side.x();
    let sha_a = sha256!(msg_key, &auth_key.data[x..x + 36]);
    let sha_b = sha256!(&auth_key.data[40 + x..40 + x + 36], msg_key);

    let mut aes_key = [0u8; 32];
    aes_key[..8].copy_from_slice(&sha_a[..8]);
    aes_key[8..24].copy_from_slice(&sha_b[8..24]);
    aes_key[24..].copy_from_slice(&sha_a[24..]);

    let mut aes_iv = [0u8; 32];
    aes_iv[..8].copy_from_slice(&sha_b[..8]);
    aes_iv[8..24].copy_from_slice(&sha_a[8..24]);
    aes_iv[24..].copy_from_slice(&sha_b[24..]);

    (aes_key, aes_iv)
}

fn padding_len(len: usize) -> usize {
    16 + (16 - (len % 16))
}

/// Encrypt `plaintext` as `side` using MTProto 2.0.
///
/// Returns `key_id || msg_key || ciphertext`. Padding bytes are random, so
/// two encryptions of the same plaintext differ.
pub fn encrypt_message(plaintext: &[u8], auth_key: &AuthKey, side: Side) -> Vec<u8> {
    let mut rnd = [0u8; 32];
    getrandom::getrandom(&mut rnd).expect("getrandom failed");
    do_encrypt_message(plaintext, auth_key, side, &rnd)
}

fn do_encrypt_message(
    plaintext: &[u8],
    auth_key: &AuthKey,
    side: Side,
    rnd: &[u8; 32],
) -> Vec<u8> {
    let pad = padding_len(plaintext.len());
    let mut padded = Vec::with_capacity(plaintext.len() + pad);
    padded.extend_from_slice(plaintext);
    padded.extend_from_slice(&rnd[..pad]);

    let x = side.x();
    let msg_key_large = sha256!(&auth_key.data[88 + x..88 + x + 32], &padded);
    let mut msg_key = [0u8; 16];
    msg_key.copy_from_slice(&msg_key_large[8..24]);

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    ige::ige_encrypt(&mut padded, &key, &iv);

    let mut out = Vec::with_capacity(24 + padded.len());
    out.extend_from_slice(&auth_key.key_id);
    out.extend_from_slice(&msg_key);
    out.extend_from_slice(&padded);
    out
}

/// Decrypt an MTProto 2.0 payload produced by `side`.
///
/// `buffer` must be `key_id || msg_key || ciphertext`. The `msg_key` check
/// runs after decryption and authenticates the whole padded plaintext; on
/// success the plaintext (padding included) is returned.
pub fn decrypt_message(
    buffer: &[u8],
    auth_key: &AuthKey,
    side: Side,
) -> Result<Vec<u8>, CryptoError> {
    if buffer.len() < 24 || (buffer.len() - 24) % 16 != 0 {
        return Err(CryptoError::BufferTooSmall);
    }
    if auth_key.key_id != buffer[..8] {
        return Err(CryptoError::AuthKeyMismatch);
    }
    let mut msg_key = [0u8; 16];
    msg_key.copy_from_slice(&buffer[8..24]);

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    let mut plain = buffer[24..].to_vec();
    ige::ige_decrypt(&mut plain, &key, &iv);

    let x = side.x();
    let our_key = sha256!(&auth_key.data[88 + x..88 + x + 32], &plain);
    if msg_key != our_key[8..24] {
        return Err(CryptoError::MessageKeyMismatch);
    }
    Ok(plain)
}
