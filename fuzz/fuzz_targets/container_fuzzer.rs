//! Fuzz target for opening encrypted containers
//!
//! # Invariants
//!
//! - Arbitrary bytes never panic `open_container`; short input is
//!   `ContainerError::TooShort`
//! - Anything sealed under a key opens under that key to the same plaintext
//! - Flipping any byte of a sealed container fails authentication

#![no_main]

use arbitrary::Arbitrary;
use backupframe_crypto::{
    BackupId, BackupKey, ContainerError, MIN_CONTAINER_LEN, MessageBackupKey, open_container,
    seal_container,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    key_seed: u8,
    iv: [u8; 16],
    plaintext: Vec<u8>,
    flip_at: usize,
    raw: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let key = MessageBackupKey::derive(
        &BackupKey::from_bytes([input.key_seed; 32]),
        &BackupId::from_bytes([input.key_seed; 16]),
        None,
    );

    match open_container(&key, &input.raw) {
        Err(ContainerError::TooShort { .. }) => assert!(input.raw.len() < MIN_CONTAINER_LEN),
        _ => assert!(input.raw.len() >= MIN_CONTAINER_LEN),
    }

    let sealed = seal_container(&key, input.iv, &input.plaintext);
    assert_eq!(open_container(&key, &sealed).as_deref(), Ok(input.plaintext.as_slice()));

    let mut tampered = sealed;
    let at = input.flip_at % tampered.len();
    tampered[at] ^= 0x01;
    assert_eq!(open_container(&key, &tampered), Err(ContainerError::MacMismatch));
});
