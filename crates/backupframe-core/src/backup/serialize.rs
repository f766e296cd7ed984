//! Serde helpers for rendering validated records.

use serde::Serializer;

/// Byte strings render as lowercase hex.
pub(crate) fn as_hex<S: Serializer>(
    bytes: &impl AsRef<[u8]>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

#[allow(clippy::ref_option)] // signature fixed by serde
pub(crate) fn opt_as_hex<S: Serializer>(
    bytes: &Option<[u8; 16]>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}
