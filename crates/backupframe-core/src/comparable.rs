//! Order-independent rendering of unencrypted backups.
//!
//! Two backups that hold the same data render to the same string even when
//! their frames, reactions or body ranges were written in a different order.
//! Used to check that an export/import cycle loses nothing.

use std::collections::{BTreeMap, BTreeSet};

use backupframe_proto::UnknownField;
use serde::Serialize;
use thiserror::Error;

use crate::{
    backup::{
        AccountData, BackupMeta, Chat, ChatItem, CompletedBackup, Destination, Purpose, Retention,
        StickerPack,
    },
    error::{ReadError, ValidationError},
    frames::read_backup,
    stream::{ReadLimits, StreamFactory, read_exact_len},
};

/// Errors from [`ComparableBackup::from_unencrypted`]
#[derive(Error, Debug)]
pub enum ComparableBackupError {
    /// The stream could not be read
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The bytes do not form a valid backup
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Fully validated backup, held for rendering.
#[derive(Debug, Clone)]
pub struct ComparableBackup {
    backup: CompletedBackup,
    unknown_fields: Vec<UnknownField>,
}

#[derive(Serialize)]
struct Rendered<'a> {
    meta: &'a BackupMeta,
    account_data: &'a AccountData,
    recipients: &'a BTreeMap<u64, Destination>,
    chats: &'a BTreeMap<u64, Chat>,
    chat_items: Vec<ChatItem>,
    sticker_packs: Vec<&'a StickerPack>,
}

impl ComparableBackup {
    /// Read and validate an unencrypted, uncompressed backup.
    ///
    /// Opens exactly one stream and reads exactly `expected_len` bytes.
    ///
    /// # Errors
    ///
    /// - `ComparableBackupError::Read` for stream faults and short streams
    /// - `ComparableBackupError::Invalid` for anything wrong with the content,
    ///   or an `expected_len` over the default plaintext limit, in which case
    ///   no stream is opened
    pub async fn from_unencrypted<F: StreamFactory>(
        purpose: Purpose,
        mut factory: F,
        expected_len: u64,
    ) -> Result<Self, ComparableBackupError> {
        let max = ReadLimits::default().max_plaintext_len;
        if expected_len > max as u64 {
            return Err(ValidationError::PlaintextTooLarge { max }.into());
        }
        let plaintext = read_exact_len(&mut factory, expected_len).await?;
        Ok(Self::from_plaintext(purpose, &plaintext)?)
    }

    /// Validate an in-memory unencrypted backup.
    ///
    /// # Errors
    ///
    /// The first problem with the content.
    pub fn from_plaintext(purpose: Purpose, plaintext: &[u8]) -> Result<Self, ValidationError> {
        let mut unknown = BTreeSet::new();
        let backup =
            read_backup(plaintext, purpose, Retention::Full, &ReadLimits::default(), &mut unknown)?
                .finalize()?;

        Ok(Self { backup, unknown_fields: unknown.into_iter().collect() })
    }

    /// The validated backup.
    pub fn backup(&self) -> &CompletedBackup {
        &self.backup
    }

    /// Fields found that the schema does not describe, sorted.
    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown_fields
    }

    /// Canonical pretty-printed JSON.
    ///
    /// Recipients and chats are keyed by id and sticker packs ordered by pack
    /// id. Chat items are ordered by chat, send time, author and finally
    /// content; reactions and body ranges within an item are sorted too.
    pub fn comparable_string(&self) -> String {
        let backup = &self.backup;

        let mut chat_items = backup.chat_items.clone();
        for item in &mut chat_items {
            item.normalize();
        }
        chat_items.sort_by_cached_key(|item| {
            let content = serde_json::to_string(item).unwrap_or_default();
            (item.chat_id, item.date_sent, item.author_id, content)
        });

        let rendered = Rendered {
            meta: &backup.meta,
            account_data: &backup.account_data,
            recipients: &backup.recipients,
            chats: &backup.chats,
            chat_items,
            sticker_packs: backup.sticker_packs.values().collect(),
        };

        let Ok(json) = serde_json::to_string_pretty(&rendered) else {
            unreachable!("validated backups contain only JSON-representable values");
        };
        json
    }
}
