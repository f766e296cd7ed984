//! Backup container framing and record schema.
//!
//! A plaintext backup is a sequence of varint length-prefixed protobuf
//! records:
//!
//! ```text
//! <varint len> <BackupInfo> { <varint len> <Frame> }*
//! ```
//!
//! This crate knows the byte layout and the record shapes. It never decrypts
//! and never judges record content beyond "does it parse"; semantic checks
//! live in `backupframe-core`.
//!
//! # Components
//!
//! - [`varint`]: little-endian base-128 length prefixes
//! - [`reader`]: zero-copy iteration over delimited records
//! - [`schema`]: `BackupInfo` and `Frame` record types
//! - [`unknown`]: detection of fields the schema does not describe

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod reader;
pub mod schema;
pub mod unknown;
pub mod varint;

pub use error::{ProtoError, Result};
pub use reader::{DelimitedReader, write_delimited};
pub use schema::{BackupInfo, Frame, decode_backup_info, decode_frame};
pub use unknown::{UnknownField, scan_unknown_fields};
