//! Installed sticker packs.

use backupframe_proto::schema as proto;
use serde::Serialize;
use thiserror::Error;

use super::serialize::as_hex;

/// Pack id length
pub const PACK_ID_LEN: usize = 16;

/// Pack key length
pub const PACK_KEY_LEN: usize = 32;

/// Validated [`proto::StickerPack`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StickerPack {
    /// Pack identifier
    #[serde(serialize_with = "as_hex")]
    pub pack_id: [u8; PACK_ID_LEN],
    /// Pack decryption key
    #[serde(serialize_with = "as_hex")]
    pub pack_key: [u8; PACK_KEY_LEN],
}

/// Problems with a `StickerPack` frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StickerPackError {
    /// Pack id has the wrong length
    #[error("pack id was {0} bytes, expected 16")]
    InvalidId(usize),

    /// Pack key has the wrong length
    #[error("pack key was {0} bytes, expected 32")]
    InvalidKey(usize),

    /// Pack id already seen
    #[error("duplicate sticker pack id {0}")]
    DuplicateId(String),
}

impl TryFrom<proto::StickerPack> for StickerPack {
    type Error = StickerPackError;

    fn try_from(value: proto::StickerPack) -> Result<Self, Self::Error> {
        let proto::StickerPack { pack_id, pack_key } = value;

        let pack_id = <[u8; PACK_ID_LEN]>::try_from(pack_id.as_slice())
            .map_err(|_| StickerPackError::InvalidId(pack_id.len()))?;
        let pack_key = <[u8; PACK_KEY_LEN]>::try_from(pack_key.as_slice())
            .map_err(|_| StickerPackError::InvalidKey(pack_key.len()))?;

        Ok(Self { pack_id, pack_key })
    }
}
