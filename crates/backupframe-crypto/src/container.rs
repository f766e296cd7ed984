//! Encrypted container envelope: AES-256-CBC with an HMAC-SHA256 trailer
//!
//! ```text
//! ┌──────────┬──────────────────────────────┬──────────────────────┐
//! │ IV (16)  │ AES-256-CBC/PKCS#7 body      │ HMAC-SHA256 (32)     │
//! └──────────┴──────────────────────────────┴──────────────────────┘
//!              MAC input = IV ‖ body, key = hmac_key
//! ```
//!
//! All functions are pure - the IV must be provided by the caller.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{error::ContainerError, keys::MessageBackupKey};

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Initialization vector length
pub const IV_LEN: usize = 16;

/// HMAC-SHA256 tag length
pub const MAC_LEN: usize = 32;

/// AES block length
const BLOCK_LEN: usize = 16;

/// Smallest possible container: IV, one padded block, MAC
pub const MIN_CONTAINER_LEN: usize = IV_LEN + BLOCK_LEN + MAC_LEN;

/// Authenticate and decrypt a whole container.
///
/// # Errors
///
/// - `TooShort`: fewer than [`MIN_CONTAINER_LEN`] bytes
/// - `MacMismatch`: trailing tag does not authenticate IV and body
/// - `BadPadding`: body is not block aligned or PKCS#7 padding is invalid
///
/// # Security
///
/// The MAC is checked in constant time before the cipher ever sees the body.
pub fn open_container(key: &MessageBackupKey, container: &[u8]) -> Result<Vec<u8>, ContainerError> {
    if container.len() < MIN_CONTAINER_LEN {
        return Err(ContainerError::TooShort { len: container.len(), min: MIN_CONTAINER_LEN });
    }

    let (authenticated, tag) = container.split_at(container.len() - MAC_LEN);
    let mut mac = new_mac(key);
    mac.update(authenticated);
    mac.verify_slice(tag).map_err(|_| ContainerError::MacMismatch)?;

    let (iv, body) = authenticated.split_at(IV_LEN);
    if body.len() % BLOCK_LEN != 0 {
        return Err(ContainerError::BadPadding);
    }

    let Ok(cipher) = Aes256CbcDec::new_from_slices(key.aes_key(), iv) else {
        unreachable!("AES-256 key and IV lengths are fixed");
    };
    cipher.decrypt_padded_vec_mut::<Pkcs7>(body).map_err(|_| ContainerError::BadPadding)
}

/// Encrypt and authenticate `plaintext` into a container.
///
/// Caller MUST provide a fresh random IV in production.
pub fn seal_container(key: &MessageBackupKey, iv: [u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    let Ok(cipher) = Aes256CbcEnc::new_from_slices(key.aes_key(), &iv) else {
        unreachable!("AES-256 key and IV lengths are fixed");
    };
    let body = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut container = Vec::with_capacity(IV_LEN + body.len() + MAC_LEN);
    container.extend_from_slice(&iv);
    container.extend_from_slice(&body);

    let mut mac = new_mac(key);
    mac.update(&container);
    container.extend_from_slice(&mac.finalize().into_bytes());

    container
}

fn new_mac(key: &MessageBackupKey) -> HmacSha256 {
    let Ok(mac) = HmacSha256::new_from_slice(key.hmac_key()) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac
}
