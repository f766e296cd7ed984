//! Decoding plaintext records into the accumulator.

use std::collections::BTreeSet;

use backupframe_proto::{
    BackupInfo, DelimitedReader, Frame, UnknownField, decode_backup_info, decode_frame,
    scan_unknown_fields, unknown,
};

use crate::{
    backup::{PartialBackup, Purpose, Retention},
    error::ValidationError,
    stream::ReadLimits,
};

/// Decode a header record, reporting fields the schema does not know.
pub(crate) fn parse_backup_info(
    bytes: &[u8],
) -> Result<(BackupInfo, Vec<UnknownField>), ValidationError> {
    let info = decode_backup_info(bytes)?;
    let fields = scan_unknown_fields(bytes, &unknown::BACKUP_INFO)?;
    Ok((info, fields))
}

/// Decode a frame record, reporting fields the schema does not know.
pub(crate) fn parse_frame(bytes: &[u8]) -> Result<(Frame, Vec<UnknownField>), ValidationError> {
    let frame = decode_frame(bytes)?;
    let fields = scan_unknown_fields(bytes, &unknown::FRAME)?;
    Ok((frame, fields))
}

/// Record newly seen unknown fields, logging each the first time.
pub(crate) fn note_unknown(
    seen: &mut BTreeSet<UnknownField>,
    fields: impl IntoIterator<Item = UnknownField>,
) {
    for field in fields {
        if !seen.contains(&field) {
            tracing::warn!(path = %field.path, number = field.field, "unknown field");
            seen.insert(field);
        }
    }
}

/// Read a whole plaintext backup: header, then every frame.
///
/// Unknown fields are recorded in `seen` as they are found, so they are
/// still available when a later record is rejected.
///
/// # Errors
///
/// The first framing, decoding or validation problem.
pub(crate) fn read_backup(
    plaintext: &[u8],
    purpose: Purpose,
    retention: Retention,
    limits: &ReadLimits,
    seen: &mut BTreeSet<UnknownField>,
) -> Result<PartialBackup, ValidationError> {
    let mut records = DelimitedReader::with_max_record_len(plaintext, limits.max_frame_len);

    let info_bytes = records.next_record()?.ok_or(ValidationError::MissingBackupInfo)?;
    let (info, fields) = parse_backup_info(info_bytes)?;
    note_unknown(seen, fields);

    let mut backup = PartialBackup::new(info, purpose, retention)?;
    tracing::debug!(version = backup.meta().version, "read backup info");

    let mut frame_count = 0u64;
    while let Some(record) = records.next_record()? {
        let (frame, fields) = parse_frame(record)?;
        note_unknown(seen, fields);
        backup.add_frame(frame)?;
        frame_count += 1;
    }

    tracing::debug!(frame_count, offset = records.offset(), "read all frames");
    Ok(backup)
}
