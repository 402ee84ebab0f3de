//! AES-CBC envelope codec for the encrypted (v2) provider protocol.
//!
//! Keys and IVs are provisioned as base64 strings alongside the provider
//! configuration. The IV is never transmitted. Plaintext is padded with
//! PKCS#7 to the 16-byte block size before encryption.
//!
//! Encrypted output is base64 and then URL percent-encoded, because it is
//! sent as a form field. Decryption accepts either form.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Lenient decoder for ciphertext: accepts missing `=` padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors from the cipher codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("key base64 decode error: {0}")]
    KeyEncoding(String),

    #[error("IV base64 decode error: {0}")]
    IvEncoding(String),

    #[error("invalid key length: {0} bytes (expected 16, 24 or 32)")]
    KeyLength(usize),

    #[error("invalid IV length: {0} bytes (expected 16)")]
    IvLength(usize),

    #[error("ciphertext base64 decode error: {0}")]
    CiphertextEncoding(String),

    #[error("ciphertext length {0} is not a multiple of the block size")]
    CiphertextLength(usize),

    #[error("decrypted data is empty")]
    Empty,

    #[error("invalid padding size")]
    PaddingSize,

    #[error("invalid padding")]
    Padding,

    #[error("decrypted payload is not valid UTF-8")]
    Utf8,
}

/// Encrypt `plaintext` and return URL-encoded base64 ciphertext.
pub fn encrypt(plaintext: &str, b64_key: &str, b64_iv: &str) -> Result<String, CipherError> {
    let (key, iv) = decode_key_iv(b64_key, b64_iv)?;
    let padded = pad(plaintext.as_bytes());

    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(&key, &iv)
            .map_err(|_| CipherError::KeyLength(key.len()))?
            .encrypt_padded_vec_mut::<NoPadding>(&padded),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(&key, &iv)
            .map_err(|_| CipherError::KeyLength(key.len()))?
            .encrypt_padded_vec_mut::<NoPadding>(&padded),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(&key, &iv)
            .map_err(|_| CipherError::KeyLength(key.len()))?
            .encrypt_padded_vec_mut::<NoPadding>(&padded),
        n => return Err(CipherError::KeyLength(n)),
    };

    let encoded = STANDARD.encode(ciphertext);
    Ok(urlencoding::encode(&encoded).into_owned())
}

/// Decrypt base64 (optionally URL-encoded) ciphertext into a UTF-8 string.
///
/// Whitespace and line breaks are stripped first, and the URL-safe base64
/// alphabet is accepted.
pub fn decrypt(input: &str, b64_key: &str, b64_iv: &str) -> Result<String, CipherError> {
    let (key, iv) = decode_key_iv(b64_key, b64_iv)?;

    let ciphertext = LENIENT
        .decode(sanitize(input))
        .map_err(|e| CipherError::CiphertextEncoding(e.to_string()))?;

    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::CiphertextLength(ciphertext.len()));
    }

    let decrypted = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(&key, &iv)
            .map_err(|_| CipherError::KeyLength(key.len()))?
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(&key, &iv)
            .map_err(|_| CipherError::KeyLength(key.len()))?
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(&key, &iv)
            .map_err(|_| CipherError::KeyLength(key.len()))?
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext),
        n => return Err(CipherError::KeyLength(n)),
    }
    .map_err(|_| CipherError::CiphertextLength(ciphertext.len()))?;

    let plaintext = unpad(&decrypted)?;
    String::from_utf8(plaintext.to_vec()).map_err(|_| CipherError::Utf8)
}

fn decode_key_iv(b64_key: &str, b64_iv: &str) -> Result<(Vec<u8>, Vec<u8>), CipherError> {
    let key = STANDARD
        .decode(b64_key.trim())
        .map_err(|e| CipherError::KeyEncoding(e.to_string()))?;
    let iv = STANDARD
        .decode(b64_iv.trim())
        .map_err(|e| CipherError::IvEncoding(e.to_string()))?;

    if !matches!(key.len(), 16 | 24 | 32) {
        return Err(CipherError::KeyLength(key.len()));
    }
    if iv.len() != BLOCK_SIZE {
        return Err(CipherError::IvLength(iv.len()));
    }

    Ok((key, iv))
}

/// Normalize incoming ciphertext text to standard base64.
fn sanitize(input: &str) -> String {
    let text = if input.contains('%') {
        urlencoding::decode(input)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| input.to_string())
    } else {
        input.to_string()
    };

    text.chars()
        .filter(|c| !matches!(c, ' ' | '\n' | '\r' | '\t'))
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect()
}

/// Apply PKCS#7 padding. Always adds between 1 and `BLOCK_SIZE` bytes.
fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Validate and strip PKCS#7 padding.
fn unpad(data: &[u8]) -> Result<&[u8], CipherError> {
    let Some(&last) = data.last() else {
        return Err(CipherError::Empty);
    };

    let pad_len = last as usize;
    if pad_len == 0 || pad_len > data.len() {
        return Err(CipherError::PaddingSize);
    }

    let (body, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| b != last) {
        return Err(CipherError::Padding);
    }

    Ok(body)
}
