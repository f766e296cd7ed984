//! Fuzz target for frame-at-a-time validation
//!
//! # Strategy
//!
//! - Header: arbitrary bytes, or a well-formed version 1 header
//! - Frames: arbitrary byte strings, fed one at a time
//!
//! # Invariants
//!
//! - Nothing panics, whatever the frames contain
//! - The online verdict matches validating the same records as one
//!   unencrypted backup

#![no_main]

use arbitrary::Arbitrary;
use backupframe_core::{ComparableBackup, OnlineBackupValidator, Purpose};
use backupframe_proto::write_delimited;
use libfuzzer_sys::fuzz_target;

/// Serialized `BackupInfo { version: 1, media_root_backup_key: [0; 32] }`
const VALID_HEADER: [u8; 36] = [
    0x08, 0x01, 0x1a, 0x20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
];

#[derive(Debug, Arbitrary)]
enum Header {
    Valid,
    Raw(Vec<u8>),
}

#[derive(Debug, Arbitrary)]
struct Input {
    remote: bool,
    header: Header,
    frames: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let purpose = if input.remote { Purpose::RemoteBackup } else { Purpose::DeviceTransfer };
    let header = match &input.header {
        Header::Valid => VALID_HEADER.to_vec(),
        Header::Raw(bytes) => bytes.clone(),
    };

    let online_ok = match OnlineBackupValidator::new(&header, purpose) {
        Ok(mut validator) => {
            let mut ok = true;
            for frame in &input.frames {
                ok &= validator.add_frame(frame).is_ok();
            }
            ok && validator.finalize().is_ok()
        },
        Err(_) => false,
    };

    let mut plaintext = Vec::new();
    write_delimited(&header, &mut plaintext);
    for frame in &input.frames {
        write_delimited(frame, &mut plaintext);
    }
    let whole_ok = ComparableBackup::from_plaintext(purpose, &plaintext).is_ok();

    assert_eq!(online_ok, whole_ok, "online and whole-backup verdicts disagree");
});
