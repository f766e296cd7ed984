//! Assembling backups byte by byte.

use std::io::Write;

use backupframe_crypto::{IV_LEN, MessageBackupKey, seal_container};
use backupframe_proto::{BackupInfo, Frame, write_delimited};
use flate2::{Compression, write::GzEncoder};
use prost::Message;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Builds plaintext and encrypted backups from records.
///
/// Records are stored serialized, so tests can mix well-formed frames with
/// hand-crafted bytes.
#[derive(Debug, Clone, Default)]
pub struct BackupBuilder {
    backup_info: Vec<u8>,
    frames: Vec<Vec<u8>>,
}

impl BackupBuilder {
    /// Start from a header.
    pub fn new(info: &BackupInfo) -> Self {
        Self::from_raw_header(info.encode_to_vec())
    }

    /// Start from arbitrary header bytes.
    pub fn from_raw_header(backup_info: Vec<u8>) -> Self {
        Self { backup_info, frames: Vec::new() }
    }

    /// Append a frame.
    #[must_use]
    pub fn frame(mut self, frame: &Frame) -> Self {
        self.push(frame);
        self
    }

    /// Append several frames.
    #[must_use]
    pub fn frames<'a>(mut self, frames: impl IntoIterator<Item = &'a Frame>) -> Self {
        for frame in frames {
            self.push(frame);
        }
        self
    }

    /// Append arbitrary frame bytes.
    #[must_use]
    pub fn raw_frame(mut self, bytes: Vec<u8>) -> Self {
        self.frames.push(bytes);
        self
    }

    /// Append a frame in place.
    pub fn push(&mut self, frame: &Frame) {
        self.frames.push(frame.encode_to_vec());
    }

    /// Serialized header.
    pub fn backup_info_bytes(&self) -> &[u8] {
        &self.backup_info
    }

    /// Serialized frames, in order, without length prefixes.
    pub fn frame_bytes(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Delimited header followed by delimited frames.
    pub fn to_plaintext(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_delimited(&self.backup_info, &mut out);
        for frame in &self.frames {
            write_delimited(frame, &mut out);
        }
        out
    }

    /// Compress and seal the plaintext with a caller-chosen IV.
    pub fn to_encrypted(&self, key: &MessageBackupKey, iv: [u8; IV_LEN]) -> Vec<u8> {
        seal_container(key, iv, &gzip(&self.to_plaintext()))
    }

    /// Compress and seal the plaintext with an IV drawn from `seed`.
    pub fn to_encrypted_seeded(&self, key: &MessageBackupKey, seed: u64) -> Vec<u8> {
        let mut iv = [0u8; IV_LEN];
        ChaCha20Rng::seed_from_u64(seed).fill_bytes(&mut iv);
        self.to_encrypted(key, iv)
    }
}

/// Gzip `data` as a backup writer would.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let Ok(()) = encoder.write_all(data) else {
        unreachable!("writing to a Vec cannot fail");
    };
    let Ok(compressed) = encoder.finish() else {
        unreachable!("writing to a Vec cannot fail");
    };
    compressed
}
