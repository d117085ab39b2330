//! AES-256 in Infinite Garble Extension mode.
//!
//! IGE chains both the previous plaintext and the previous ciphertext block
//! into each encryption, so a single corrupted block garbles everything after
//! it. The 32-byte IV holds the two initial chaining blocks.

use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

const BLOCK: usize = 16;

fn xor_block(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// Encrypt `data` in place. `data.len()` must be a multiple of 16.
pub fn ige_encrypt(data: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    debug_assert_eq!(data.len() % BLOCK, 0);
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut prev_cipher: [u8; BLOCK] = iv[..BLOCK].try_into().unwrap();
    let mut prev_plain: [u8; BLOCK] = iv[BLOCK..].try_into().unwrap();

    for chunk in data.chunks_exact_mut(BLOCK) {
        let plain: [u8; BLOCK] = chunk.try_into().unwrap();
        xor_block(chunk, &prev_cipher);
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        xor_block(chunk, &prev_plain);
        prev_cipher.copy_from_slice(chunk);
        prev_plain = plain;
    }
}

/// Decrypt `data` in place. `data.len()` must be a multiple of 16.
pub fn ige_decrypt(data: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    debug_assert_eq!(data.len() % BLOCK, 0);
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut prev_cipher: [u8; BLOCK] = iv[..BLOCK].try_into().unwrap();
    let mut prev_plain: [u8; BLOCK] = iv[BLOCK..].try_into().unwrap();

    for chunk in data.chunks_exact_mut(BLOCK) {
        let cipher_block: [u8; BLOCK] = chunk.try_into().unwrap();
        xor_block(chunk, &prev_plain);
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
        xor_block(chunk, &prev_cipher);
        prev_plain.copy_from_slice(chunk);
        prev_cipher = cipher_block;
    }
}
