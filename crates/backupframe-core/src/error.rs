//! Error types for backup validation.
//!
//! Two channels, kept strictly apart:
//!
//! - [`ReadError`]: the input could not be read at all (stream fault, short
//!   stream). Returned as `Err` from the stream-consuming entry points.
//! - [`ValidationError`]: the bytes were read but do not form a valid backup.
//!   The streaming validator reports these as a finding inside its outcome.

use std::io;

use backupframe_crypto::ContainerError;
use backupframe_proto::ProtoError;
use thiserror::Error;

use crate::backup::{
    AccountDataError, ChatError, ChatItemError, RecipientError, StickerPackError,
};

/// Faults while pulling bytes from the caller's stream
#[derive(Error, Debug)]
pub enum ReadError {
    /// Stream ended before the declared length was reached
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// Opening or reading the stream failed; the original error is preserved
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Structural findings that make a backup unusable
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Framing or protobuf decoding failed
    #[error(transparent)]
    Proto(#[from] ProtoError),

    /// Container failed authentication or decryption
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Declared container length exceeds the configured limit
    #[error("backup of {len} bytes exceeds the {max} byte limit")]
    ContainerTooLarge {
        /// Declared length
        len: u64,
        /// Configured limit
        max: u64,
    },

    /// Decrypted payload is not valid gzip
    #[error("failed to decompress backup: {0}")]
    Decompression(String),

    /// Bytes follow the end of the gzip stream
    #[error("{len} bytes of trailing data after compressed backup")]
    TrailingData {
        /// Number of trailing bytes
        len: usize,
    },

    /// Decompressed payload exceeds the configured limit
    #[error("decompressed backup exceeds {max} bytes")]
    PlaintextTooLarge {
        /// Configured limit
        max: usize,
    },

    /// Input holds no records at all
    #[error("missing BackupInfo")]
    MissingBackupInfo,

    /// Header carries a version this validator does not understand
    #[error("unsupported backup version {0}")]
    UnsupportedVersion(u64),

    /// Header media root key has the wrong length
    #[error("media root backup key was {0} bytes, expected 32")]
    InvalidMediaRootBackupKey(usize),

    /// Frame decoded but its `item` oneof is empty
    #[error("Frame.item is a oneof but has no value")]
    FrameWithoutItem,

    /// Invalid `AccountData` frame
    #[error("AccountData: {0}")]
    AccountData(#[from] AccountDataError),

    /// Invalid `Recipient` frame
    #[error("recipient {id}: {source}")]
    Recipient {
        /// Recipient id from the frame
        id: u64,
        /// What was wrong with it
        source: RecipientError,
    },

    /// Invalid `Chat` frame
    #[error("chat {id}: {source}")]
    Chat {
        /// Chat id from the frame
        id: u64,
        /// What was wrong with it
        source: ChatError,
    },

    /// Invalid `ChatItem` frame
    #[error("chat item in chat {chat_id} sent at {date_sent}: {source}")]
    ChatItem {
        /// Chat the item claims to belong to
        chat_id: u64,
        /// Send timestamp, identifies the item within its chat
        date_sent: u64,
        /// What was wrong with it
        source: ChatItemError,
    },

    /// Invalid `StickerPack` frame
    #[error("sticker pack: {0}")]
    StickerPack(#[from] StickerPackError),

    /// Backup ended without an `AccountData` frame
    #[error("no AccountData frame found")]
    MissingAccountData,

    /// Backup ended without a Self recipient
    #[error("no Self recipient found")]
    MissingSelfRecipient,
}

impl ValidationError {
    /// Returns true if the backup could not be authenticated.
    ///
    /// Usually means the wrong key was supplied rather than damaged data.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Container(e) if e.is_authentication_failure())
    }
}
