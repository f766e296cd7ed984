//! Splitting a plaintext container into length-delimited records.
//!
//! Each record is `<varint length> <length bytes>`. The reader borrows the
//! input and hands out sub-slices; it never copies and never interprets the
//! record bytes.

use bytes::BufMut;

use crate::{
    error::{ProtoError, Result},
    varint::{decode_varint, encode_varint},
};

/// Zero-copy reader over a buffer of delimited records.
///
/// # Invariants
///
/// - `pos <= buf.len()`
/// - After any error the reader is exhausted; subsequent calls return
///   `Ok(None)`
#[derive(Debug, Clone)]
pub struct DelimitedReader<'a> {
    buf: &'a [u8],
    pos: usize,
    max_record_len: usize,
}

impl<'a> DelimitedReader<'a> {
    /// Default per-record limit (16 MB)
    pub const DEFAULT_MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

    /// Reader with the default record limit.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_max_record_len(buf, Self::DEFAULT_MAX_RECORD_LEN)
    }

    /// Reader rejecting records longer than `max_record_len`.
    pub fn with_max_record_len(buf: &'a [u8], max_record_len: usize) -> Self {
        Self { buf, pos: 0, max_record_len }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Next record, or `None` at a clean end of input.
    ///
    /// # Errors
    ///
    /// - `ProtoError::TruncatedLength` if input ends inside a length prefix
    /// - `ProtoError::VarintOverflow` if the prefix is malformed
    /// - `ProtoError::RecordTooLarge` if the prefix exceeds the limit
    /// - `ProtoError::TruncatedRecord` if input ends inside the record
    ///
    /// # Security
    ///
    /// The length limit is checked before slicing, so a hostile prefix never
    /// drives an allocation or a read past the buffer.
    pub fn next_record(&mut self) -> Result<Option<&'a [u8]>> {
        let rest = &self.buf[self.pos..];
        if rest.is_empty() {
            return Ok(None);
        }

        match self.split_record(rest) {
            Ok((record, consumed)) => {
                self.pos += consumed;
                debug_assert!(self.pos <= self.buf.len());
                Ok(Some(record))
            },
            Err(e) => {
                self.pos = self.buf.len();
                Err(e)
            },
        }
    }

    fn split_record(&self, rest: &'a [u8]) -> Result<(&'a [u8], usize)> {
        let (len, prefix_len) = decode_varint(rest)?.ok_or(ProtoError::TruncatedLength)?;

        if len > self.max_record_len as u64 {
            return Err(ProtoError::RecordTooLarge { size: len, max: self.max_record_len });
        }
        // INVARIANT: len <= max_record_len, which is a usize
        let len = len as usize;

        let body = &rest[prefix_len..];
        let Some(record) = body.get(..len) else {
            return Err(ProtoError::TruncatedRecord { expected: len as u64, actual: body.len() });
        };

        Ok((record, prefix_len + len))
    }
}

impl<'a> Iterator for DelimitedReader<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Append `record` with its varint length prefix.
pub fn write_delimited(record: &[u8], dst: &mut impl BufMut) {
    encode_varint(record.len() as u64, dst);
    dst.put_slice(record);
}
