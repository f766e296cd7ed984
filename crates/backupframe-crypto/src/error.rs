//! Error types for key parsing and container opening

use thiserror::Error;

/// Errors from parsing key material
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Account entropy pool has the wrong length or a character outside the
    /// alphabet
    #[error("invalid account entropy pool")]
    InvalidAccountEntropyPool,

    /// Invalid key material length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },
}

/// Errors from opening an encrypted container
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Container cannot hold an IV, one cipher block and a MAC
    #[error("container too short: {len} bytes, need at least {min}")]
    TooShort {
        /// Container length
        len: usize,
        /// Minimum container length
        min: usize,
    },

    /// HMAC over IV and ciphertext did not match the trailing tag
    #[error("HMAC doesn't match")]
    MacMismatch,

    /// Ciphertext is not a whole number of blocks or padding is malformed
    #[error("decryption failed: invalid padding")]
    BadPadding,
}

impl ContainerError {
    /// Returns true if the container failed authentication.
    ///
    /// A MAC mismatch usually means the wrong key was supplied; the other
    /// variants mean the bytes themselves are damaged.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::MacMismatch)
    }
}
