//! Framing and record decoding errors.

use thiserror::Error;

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, ProtoError>;

/// Errors from splitting or decoding backup records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// Varint longer than ten bytes or exceeding `u64`
    #[error("varint overflow")]
    VarintOverflow,

    /// Input ended inside a length prefix
    #[error("truncated length prefix")]
    TruncatedLength,

    /// Input ended inside a record
    #[error("truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord {
        /// Length claimed by the prefix
        expected: u64,
        /// Bytes actually available
        actual: usize,
    },

    /// Record length exceeds the configured limit
    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge {
        /// Length claimed by the prefix
        size: u64,
        /// Configured limit
        max: usize,
    },

    /// Protobuf payload does not parse as the expected message
    #[error("failed to decode {message}: {reason}")]
    Decode {
        /// Message type being decoded
        message: &'static str,
        /// Decoder diagnostic
        reason: String,
    },

    /// Wire type the scanner does not accept (groups or reserved values)
    #[error("unsupported wire type {wire_type} for field {field} in {path}")]
    UnsupportedWireType {
        /// Message path
        path: String,
        /// Field number
        field: u32,
        /// Raw wire type
        wire_type: u8,
    },
}
