//! Fuzz target for record framing and decoding
//!
//! Feeds arbitrary bytes through the same path a decrypted payload takes:
//! split into delimited records, decode the first as `BackupInfo` and the
//! rest as `Frame`, and scan each for unknown fields.
//!
//! # Invariants
//!
//! - Nothing panics; every malformed input is a structured error
//! - The reader never reports an offset past the end of its input
//! - After an error the reader yields nothing further

#![no_main]

use backupframe_proto::{DelimitedReader, decode_backup_info, decode_frame, scan_unknown_fields, unknown};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = DelimitedReader::with_max_record_len(data, 4096);
    let mut first = true;

    loop {
        match reader.next_record() {
            Ok(Some(record)) => {
                if first {
                    let _ = decode_backup_info(record);
                    let _ = scan_unknown_fields(record, &unknown::BACKUP_INFO);
                    first = false;
                } else {
                    let _ = decode_frame(record);
                    let _ = scan_unknown_fields(record, &unknown::FRAME);
                }
            },
            Ok(None) => break,
            Err(_) => {
                assert_eq!(reader.next_record(), Ok(None), "reader must be exhausted after error");
                break;
            },
        }
        assert!(reader.offset() <= data.len());
    }
});
