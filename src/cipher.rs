//! Authenticated encryption for individual blobs
//!
//! AES-CBC with PKCS#7 padding, authenticated by HMAC-SHA256 over the IV and
//! ciphertext (encrypt-then-MAC). The key size selects AES-128, AES-192 or
//! AES-256. Wire layout:
//!
//! ```text
//! [IV (16 bytes)][CBC ciphertext (N bytes, N % 16 == 0)][HMAC-SHA256 tag (32 bytes)]
//! ```
//!
//! The same key feeds both AES and HMAC. That keeps the layout compatible with
//! stores produced by earlier packers; see DESIGN.md.

use crate::error::{EmbedError, Result};
use aes::cipher::{
    block_padding::Pkcs7, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};
use aes::{Aes128, Aes192, Aes256};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// AES block size, also the IV size
pub const BLOCK_SIZE: usize = 16;

/// HMAC-SHA256 tag size
pub const TAG_SIZE: usize = 32;

/// Smallest valid ciphertext: IV, one padded block, tag
pub const MIN_CIPHERTEXT_SIZE: usize = BLOCK_SIZE * 2 + TAG_SIZE;

/// Key sizes accepted by [`encrypt`] and [`decrypt`]
pub const VALID_KEY_SIZES: [usize; 3] = [16, 24, 32];

/// Encrypt `plaintext` under `key`.
///
/// A fresh IV is drawn from the operating system's random source on every call,
/// so encrypting the same plaintext twice yields different outputs.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    let mut iv = [0u8; BLOCK_SIZE];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = match key.len() {
        16 => cbc_encrypt::<Aes128>(key, &iv, plaintext)?,
        24 => cbc_encrypt::<Aes192>(key, &iv, plaintext)?,
        _ => cbc_encrypt::<Aes256>(key, &iv, plaintext)?,
    };

    let mut output = Vec::with_capacity(BLOCK_SIZE + ciphertext.len() + TAG_SIZE);
    output.extend_from_slice(&iv);
    output.extend_from_slice(&ciphertext);

    let tag = compute_tag(key, &output)?;
    output.extend_from_slice(&tag);

    Ok(output)
}

/// Verify and decrypt `input` produced by [`encrypt`].
///
/// Checks run in this order: length, key, tag, padding. The tag is compared in
/// constant time and nothing is decrypted unless it matches.
pub fn decrypt(key: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    if input.len() < MIN_CIPHERTEXT_SIZE || (input.len() - TAG_SIZE) % BLOCK_SIZE != 0 {
        return Err(EmbedError::InvalidCiphertextLength(input.len()));
    }
    check_key(key)?;

    let (authenticated, tag) = input.split_at(input.len() - TAG_SIZE);
    let mut mac = new_mac(key)?;
    mac.update(authenticated);
    mac.verify_slice(tag)
        .map_err(|_| EmbedError::AuthenticationFailed)?;

    let (iv, ciphertext) = authenticated.split_at(BLOCK_SIZE);
    match key.len() {
        16 => cbc_decrypt::<Aes128>(key, iv, ciphertext),
        24 => cbc_decrypt::<Aes192>(key, iv, ciphertext),
        _ => cbc_decrypt::<Aes256>(key, iv, ciphertext),
    }
}

/// Check that `key` selects one of the supported AES variants
pub fn check_key(key: &[u8]) -> Result<()> {
    if VALID_KEY_SIZES.contains(&key.len()) {
        Ok(())
    } else {
        Err(EmbedError::InvalidKeyLength(key.len()))
    }
}

fn new_mac(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|_| EmbedError::InvalidKeyLength(key.len()))
}

fn compute_tag(key: &[u8], data: &[u8]) -> Result<[u8; TAG_SIZE]> {
    let mut mac = new_mac(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher,
    cbc::Encryptor<C>: KeyIvInit + BlockEncryptMut,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| EmbedError::InvalidKeyLength(key.len()))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockDecryptMut + BlockCipher,
    cbc::Decryptor<C>: KeyIvInit + BlockDecryptMut,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| EmbedError::InvalidKeyLength(key.len()))?;
    // Pkcs7 unpadding rejects a pad byte of 0, a pad byte above the block
    // size, and pad bytes that disagree with the count.
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EmbedError::MalformedPadding)
}
