//! Backupframe Cryptographic Primitives
//!
//! Key hierarchy and container cipher for encrypted message backups. Pure
//! functions with deterministic outputs. Callers provide random bytes (the
//! container IV) so fixtures stay reproducible.
//!
//! # Key Hierarchy
//!
//! ```text
//! AccountEntropyPool (64 chars)
//!        │
//!        ▼  HKDF "20240801_SIGNAL_BACKUP_KEY"
//! BackupKey (32 bytes) ──────────────┐
//!        │                           │
//!        ▼  HKDF "…BACKUP_ID:" ‖ ACI │
//! BackupId (16 bytes)                │
//!        │                           │
//!        ▼                           ▼
//! HKDF(salt = forward secrecy token?, ikm = BackupKey, info = label ‖ BackupId)
//!        │
//!        ▼
//! MessageBackupKey { hmac_key, aes_key }
//! ```
//!
//! A caller may enter the hierarchy at the top (entropy pool plus ACI) or in
//! the middle (backup key plus backup id). Both entry points produce the same
//! [`MessageBackupKey`] when the effective key and id agree.
//!
//! # Container
//!
//! ```text
//! IV (16) ‖ AES-256-CBC/PKCS#7 ciphertext ‖ HMAC-SHA256(hmac_key, IV ‖ ciphertext)
//! ```
//!
//! The MAC is verified before any decryption happens.
//!
//! # Security
//!
//! - Domain separation: every HKDF stage uses a distinct fixed label
//! - Forward secrecy: a token, when present, salts the final stage and
//!   switches the label, so token and token-less keys never coincide
//! - Key material in [`MessageBackupKey`] and [`BackupKey`] is zeroized on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod container;
pub mod error;
pub mod keys;

pub use container::{IV_LEN, MAC_LEN, MIN_CONTAINER_LEN, open_container, seal_container};
pub use error::{ContainerError, KeyError};
pub use keys::{
    AccountEntropyPool, Aci, BackupForwardSecrecyToken, BackupId, BackupKey, MessageBackupKey,
    MessageBackupKeySource,
};
