//! Incremental validation of frames as they are produced.
//!
//! For callers that already hold individual records (a client writing a
//! backup, say) and want each one checked on the spot. Nothing is decrypted
//! or decompressed; frames arrive without their length prefix.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐  add_frame   ┌─────────┐  finalize   ┌──────────┐
//! │ Created │─────────────>│ Created │────────────>│ consumed │
//! └─────────┘  (repeat)    └─────────┘             └──────────┘
//! ```
//!
//! `finalize` takes the validator by value, so no call can follow it.

use std::collections::BTreeSet;

use backupframe_proto::{ProtoError, UnknownField};

use crate::{
    backup::{PartialBackup, Purpose, Retention},
    error::ValidationError,
    frames::{note_unknown, parse_backup_info, parse_frame},
    stream::ReadLimits,
};

/// Frame-at-a-time backup validator.
///
/// # Invariants
///
/// - A rejected frame leaves the validator as it was before the call
/// - `unknown` only holds fields from accepted records
#[derive(Debug)]
pub struct OnlineBackupValidator {
    backup: PartialBackup,
    limits: ReadLimits,
    unknown: BTreeSet<UnknownField>,
}

impl OnlineBackupValidator {
    /// Start validating a backup with the given serialized header.
    ///
    /// # Errors
    ///
    /// Any problem with the header: undecodable, unsupported version or a
    /// malformed media root key.
    pub fn new(backup_info: &[u8], purpose: Purpose) -> Result<Self, ValidationError> {
        Self::with_limits(backup_info, purpose, ReadLimits::default())
    }

    /// Like [`Self::new`] with explicit limits.
    ///
    /// # Errors
    ///
    /// As [`Self::new`], plus `ProtoError::RecordTooLarge` if the header
    /// exceeds `limits.max_frame_len`.
    pub fn with_limits(
        backup_info: &[u8],
        purpose: Purpose,
        limits: ReadLimits,
    ) -> Result<Self, ValidationError> {
        check_len(backup_info, &limits)?;
        let (info, fields) = parse_backup_info(backup_info)?;
        let backup = PartialBackup::new(info, purpose, Retention::ValidateOnly)?;

        let mut unknown = BTreeSet::new();
        note_unknown(&mut unknown, fields);

        tracing::debug!(?purpose, "online validation started");
        Ok(Self { backup, limits, unknown })
    }

    /// Validate one serialized frame and fold it in.
    ///
    /// # Errors
    ///
    /// The first problem with the frame. The validator is unchanged and may
    /// keep accepting frames.
    pub fn add_frame(&mut self, frame: &[u8]) -> Result<(), ValidationError> {
        check_len(frame, &self.limits)?;
        let (frame, fields) = parse_frame(frame)?;

        if let Err(e) = self.backup.add_frame(frame) {
            tracing::warn!(error = %e, "frame rejected");
            return Err(e);
        }

        note_unknown(&mut self.unknown, fields);
        Ok(())
    }

    /// Fields seen so far that the schema does not describe, formatted for
    /// display.
    pub fn warnings(&self) -> Vec<String> {
        self.unknown.iter().map(ToString::to_string).collect()
    }

    /// Apply closing checks. Consumes the validator.
    ///
    /// # Errors
    ///
    /// - `ValidationError::MissingAccountData` if no account data was added
    /// - `ValidationError::MissingSelfRecipient` if no Self recipient was
    ///   added
    pub fn finalize(self) -> Result<(), ValidationError> {
        let item_count = self.backup.chat_item_count();
        self.backup.finalize()?;
        tracing::debug!(item_count, "online validation finished");
        Ok(())
    }
}

fn check_len(record: &[u8], limits: &ReadLimits) -> Result<(), ValidationError> {
    if record.len() > limits.max_frame_len {
        return Err(ProtoError::RecordTooLarge {
            size: record.len() as u64,
            max: limits.max_frame_len,
        }
        .into());
    }
    Ok(())
}
