//! Backup key hierarchy using HKDF-SHA256
//!
//! Every stage is a pure function of its inputs. The labels are fixed byte
//! strings shared with other clients and must match bit-for-bit.

use std::{fmt, str::FromStr};

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::KeyError;

/// Label for deriving the backup key from the account entropy pool
const BACKUP_KEY_LABEL: &[u8] = b"20240801_SIGNAL_BACKUP_KEY";

/// Label prefix for deriving the backup id; followed by the ACI
const BACKUP_ID_LABEL: &[u8] = b"20241024_SIGNAL_BACKUP_ID:";

/// Label prefix for the message backup key; followed by the backup id
const MESSAGE_BACKUP_KEY_LABEL: &[u8] = b"20241007_SIGNAL_BACKUP_ENCRYPT_MESSAGE_BACKUP:";

/// Label prefix for the message backup key when a forward secrecy token is
/// mixed in
const MESSAGE_BACKUP_KEY_WITH_TOKEN_LABEL: &[u8] =
    b"20250708_SIGNAL_BACKUP_ENCRYPT_MESSAGE_BACKUP:";

/// User-held secret at the root of the key hierarchy.
///
/// Exactly [`Self::LENGTH`] characters from [`Self::ALPHABET`].
#[derive(Clone)]
pub struct AccountEntropyPool {
    entropy: [u8; Self::LENGTH],
}

impl AccountEntropyPool {
    /// Number of characters in a pool
    pub const LENGTH: usize = 64;

    /// Characters permitted in a pool
    pub const ALPHABET: &'static [u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    /// Syntactic check: length and alphabet only. Never fails.
    pub fn is_valid(s: &str) -> bool {
        s.len() == Self::LENGTH && s.bytes().all(|b| Self::ALPHABET.contains(&b))
    }

    /// The pool as text.
    pub fn as_str(&self) -> &str {
        // INVARIANT: every byte was checked against an ASCII alphabet on parse
        let Ok(s) = std::str::from_utf8(&self.entropy) else {
            unreachable!("account entropy pool is ASCII");
        };
        s
    }
}

impl FromStr for AccountEntropyPool {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            return Err(KeyError::InvalidAccountEntropyPool);
        }
        let mut entropy = [0u8; Self::LENGTH];
        entropy.copy_from_slice(s.as_bytes());
        Ok(Self { entropy })
    }
}

impl fmt::Debug for AccountEntropyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountEntropyPool(<redacted>)")
    }
}

impl Drop for AccountEntropyPool {
    fn drop(&mut self) {
        self.entropy.zeroize();
    }
}

/// Account identity: a UUID tagged as the ACI kind of service id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Aci([u8; 16]);

impl Aci {
    /// Wrap raw UUID bytes.
    pub const fn from_uuid_bytes(uuid: [u8; 16]) -> Self {
        Self(uuid)
    }

    /// Raw UUID bytes.
    pub const fn uuid_bytes(&self) -> [u8; 16] {
        self.0
    }

    /// Binary service-id form. ACIs carry no kind prefix, so this is the bare
    /// UUID.
    pub const fn service_id_binary(&self) -> [u8; 16] {
        self.0
    }
}

/// 32-byte symmetric secret at the root of backup key derivation.
#[derive(Clone, PartialEq, Eq)]
pub struct BackupKey([u8; Self::LEN]);

impl BackupKey {
    /// Key length in bytes
    pub const LEN: usize = 32;

    /// Wrap caller-supplied key bytes.
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the backup key from an account entropy pool.
    pub fn derive_from_account_entropy_pool(pool: &AccountEntropyPool) -> Self {
        let hkdf = Hkdf::<Sha256>::new(None, pool.as_str().as_bytes());
        let mut key = [0u8; Self::LEN];
        let Ok(()) = hkdf.expand(BACKUP_KEY_LABEL, &mut key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };
        Self(key)
    }

    /// Derive the backup id bound to this key and an account.
    pub fn derive_backup_id(&self, aci: &Aci) -> BackupId {
        let hkdf = Hkdf::<Sha256>::new(None, &self.0);
        let mut id = [0u8; BackupId::LEN];
        let Ok(()) = hkdf.expand_multi_info(&[BACKUP_ID_LABEL, &aci.service_id_binary()], &mut id)
        else {
            unreachable!("16 bytes is a valid HKDF-SHA256 output length");
        };
        BackupId(id)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for BackupKey {
    type Error = KeyError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = value.try_into().map_err(|_| KeyError::InvalidKeyLength {
            expected: Self::LEN,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for BackupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackupKey(<redacted>)")
    }
}

impl Drop for BackupKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// 16-byte backup identifier bound to a [`BackupKey`] and an [`Aci`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackupId([u8; Self::LEN]);

impl BackupId {
    /// Id length in bytes
    pub const LEN: usize = 16;

    /// Wrap caller-supplied id bytes.
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for BackupId {
    type Error = KeyError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = value.try_into().map_err(|_| KeyError::InvalidKeyLength {
            expected: Self::LEN,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

/// Optional secret mixed into the last derivation stage.
#[derive(Clone, PartialEq, Eq)]
pub struct BackupForwardSecrecyToken([u8; Self::LEN]);

impl BackupForwardSecrecyToken {
    /// Token length in bytes
    pub const LEN: usize = 32;

    /// Wrap caller-supplied token bytes.
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for BackupForwardSecrecyToken {
    type Error = KeyError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = value.try_into().map_err(|_| KeyError::InvalidKeyLength {
            expected: Self::LEN,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for BackupForwardSecrecyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackupForwardSecrecyToken(<redacted>)")
    }
}

impl Drop for BackupForwardSecrecyToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Where a [`MessageBackupKey`] derivation enters the hierarchy.
///
/// The two forms are mutually exclusive. They agree whenever the backup key
/// and id computed from `AccountEntropy` equal the explicit `BackupKey` pair.
#[derive(Debug, Clone)]
pub enum MessageBackupKeySource {
    /// Start from the user secret and the account identity
    AccountEntropy {
        /// User secret
        pool: AccountEntropyPool,
        /// Account the backup belongs to
        aci: Aci,
    },
    /// Start from an already-known backup key and id
    BackupKey {
        /// Backup key
        key: BackupKey,
        /// Backup id
        id: BackupId,
    },
}

/// Derived pair used to authenticate and decrypt a backup container.
///
/// # Invariants
///
/// - `hmac_key != aes_key` (they are disjoint halves of one HKDF output)
/// - Deterministic in (backup key, backup id, token or its absence)
#[derive(Clone)]
pub struct MessageBackupKey {
    hmac_key: [u8; Self::HMAC_KEY_LEN],
    aes_key: [u8; Self::AES_KEY_LEN],
}

impl MessageBackupKey {
    /// HMAC-SHA256 key length
    pub const HMAC_KEY_LEN: usize = 32;

    /// AES-256 key length
    pub const AES_KEY_LEN: usize = 32;

    /// Derive from a backup key and id, optionally mixing in a forward secrecy
    /// token.
    ///
    /// The token becomes the HKDF salt and selects a separate label, so the
    /// token-less derivation is never reproduced by any token value.
    pub fn derive(
        backup_key: &BackupKey,
        backup_id: &BackupId,
        forward_secrecy_token: Option<&BackupForwardSecrecyToken>,
    ) -> Self {
        let (salt, label) = match forward_secrecy_token {
            Some(token) => (Some(&token.as_bytes()[..]), MESSAGE_BACKUP_KEY_WITH_TOKEN_LABEL),
            None => (None, MESSAGE_BACKUP_KEY_LABEL),
        };

        let hkdf = Hkdf::<Sha256>::new(salt, backup_key.as_bytes());
        let mut full = [0u8; Self::HMAC_KEY_LEN + Self::AES_KEY_LEN];
        let Ok(()) = hkdf.expand_multi_info(&[label, backup_id.as_bytes()], &mut full) else {
            unreachable!("64 bytes is a valid HKDF-SHA256 output length");
        };

        let mut hmac_key = [0u8; Self::HMAC_KEY_LEN];
        let mut aes_key = [0u8; Self::AES_KEY_LEN];
        hmac_key.copy_from_slice(&full[..Self::HMAC_KEY_LEN]);
        aes_key.copy_from_slice(&full[Self::HMAC_KEY_LEN..]);
        full.zeroize();

        debug_assert_ne!(hmac_key, aes_key);

        Self { hmac_key, aes_key }
    }

    /// Derive from either entry point of the hierarchy.
    pub fn from_source(
        source: &MessageBackupKeySource,
        forward_secrecy_token: Option<&BackupForwardSecrecyToken>,
    ) -> Self {
        match source {
            MessageBackupKeySource::AccountEntropy { pool, aci } => {
                let backup_key = BackupKey::derive_from_account_entropy_pool(pool);
                let backup_id = backup_key.derive_backup_id(aci);
                Self::derive(&backup_key, &backup_id, forward_secrecy_token)
            },
            MessageBackupKeySource::BackupKey { key, id } => {
                Self::derive(key, id, forward_secrecy_token)
            },
        }
    }

    /// Key for HMAC-SHA256 over the container.
    pub fn hmac_key(&self) -> &[u8; Self::HMAC_KEY_LEN] {
        &self.hmac_key
    }

    /// Key for AES-256-CBC over the container body.
    pub fn aes_key(&self) -> &[u8; Self::AES_KEY_LEN] {
        &self.aes_key
    }
}

impl fmt::Debug for MessageBackupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageBackupKey(<redacted>)")
    }
}

impl Drop for MessageBackupKey {
    fn drop(&mut self) {
        self.hmac_key.zeroize();
        self.aes_key.zeroize();
    }
}
