//! Full validation of an encrypted backup.
//!
//! ```text
//! stream ─read─> container ─MAC, AES-CBC─> gzip ─inflate─> records ─> PartialBackup ─> finalize
//! ```
//!
//! Faults reading the stream come back as `Err(ReadError)`. Everything found
//! after the bytes are in hand is a finding in [`ValidationOutcome`].

use std::{collections::BTreeSet, io::Read};

use backupframe_crypto::{MIN_CONTAINER_LEN, MessageBackupKey, open_container};
use backupframe_proto::UnknownField;
use flate2::bufread::GzDecoder;

use crate::{
    backup::{Purpose, Retention},
    error::{ReadError, ValidationError},
    frames::read_backup,
    stream::{ReadLimits, StreamFactory, read_exact_len},
};

/// Findings from [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Why the backup is unusable; `None` means it passed
    pub error_message: Option<String>,
    /// Non-fatal findings, currently fields the schema does not describe
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// Returns true if the backup passed validation. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Validate an encrypted backup with default [`ReadLimits`].
///
/// Opens exactly one stream from `factory` and reads exactly `expected_len`
/// bytes from it. The stream is dropped before this returns. An
/// `expected_len` above [`ReadLimits::max_container_len`] is a finding and no
/// stream is opened.
///
/// # Errors
///
/// - `ReadError::Io` if the stream cannot be opened or read; the original
///   error is returned unchanged
/// - `ReadError::UnexpectedEof` if the stream holds fewer than
///   `expected_len` bytes, or `expected_len` is too small to be a container
pub async fn validate<F: StreamFactory>(
    key: &MessageBackupKey,
    purpose: Purpose,
    factory: F,
    expected_len: u64,
) -> Result<ValidationOutcome, ReadError> {
    validate_with_limits(key, purpose, factory, expected_len, ReadLimits::default()).await
}

/// Like [`validate`] with explicit limits.
///
/// # Errors
///
/// As [`validate`].
#[tracing::instrument(level = "debug", skip(key, factory))]
pub async fn validate_with_limits<F: StreamFactory>(
    key: &MessageBackupKey,
    purpose: Purpose,
    mut factory: F,
    expected_len: u64,
    limits: ReadLimits,
) -> Result<ValidationOutcome, ReadError> {
    let mut unknown = BTreeSet::new();
    let result = if expected_len > limits.max_container_len {
        Err(ValidationError::ContainerTooLarge { len: expected_len, max: limits.max_container_len })
    } else {
        let container = read_exact_len(&mut factory, expected_len).await?;
        if container.len() < MIN_CONTAINER_LEN {
            return Err(ReadError::UnexpectedEof);
        }
        check_container(key, purpose, &container, &limits, &mut unknown)
    };

    let error_message = match result {
        Ok(()) => {
            tracing::debug!("backup valid");
            None
        },
        Err(e) => {
            tracing::warn!(error = %e, "backup invalid");
            Some(e.to_string())
        },
    };

    Ok(ValidationOutcome {
        error_message,
        warnings: unknown.iter().map(ToString::to_string).collect(),
    })
}

fn check_container(
    key: &MessageBackupKey,
    purpose: Purpose,
    container: &[u8],
    limits: &ReadLimits,
    unknown: &mut BTreeSet<UnknownField>,
) -> Result<(), ValidationError> {
    let compressed = open_container(key, container)?;
    tracing::debug!(len = compressed.len(), "container authenticated");

    let plaintext = decompress(&compressed, limits.max_plaintext_len)?;
    tracing::debug!(len = plaintext.len(), "payload decompressed");

    read_backup(&plaintext, purpose, Retention::ValidateOnly, limits, unknown)?.finalize()?;
    Ok(())
}

/// Inflate a single gzip member, refusing to produce more than `max_len`
/// bytes or to ignore anything after it.
fn decompress(compressed: &[u8], max_len: usize) -> Result<Vec<u8>, ValidationError> {
    let mut plaintext = Vec::new();
    let mut decoder = GzDecoder::new(compressed);
    decoder
        .by_ref()
        .take((max_len as u64).saturating_add(1))
        .read_to_end(&mut plaintext)
        .map_err(|e| ValidationError::Decompression(e.to_string()))?;

    if plaintext.len() > max_len {
        return Err(ValidationError::PlaintextTooLarge { max: max_len });
    }

    // The bufread decoder consumes its input exactly, so whatever is left
    // followed the gzip trailer.
    let trailing = decoder.get_ref().len();
    if trailing != 0 {
        return Err(ValidationError::TrailingData { len: trailing });
    }
    Ok(plaintext)
}
