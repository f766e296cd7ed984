//! Caller-supplied byte streams and read limits.
//!
//! Validators never hold a stream longer than one call. The stream is an owned
//! value obtained from a [`StreamFactory`]; dropping it is the close, so it is
//! released exactly once whether reading succeeds, faults or comes up short.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ReadError;

/// Default limit on a single frame (16 MiB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Default limit on the decompressed payload (1 GiB)
pub const DEFAULT_MAX_PLAINTEXT_LEN: usize = 1024 * 1024 * 1024;

/// Default limit on the declared container length (1 GiB)
pub const DEFAULT_MAX_CONTAINER_LEN: u64 = 1024 * 1024 * 1024;

/// Upper bound on the buffer reserved up front from a declared length
const MAX_PREALLOCATION: u64 = 1024 * 1024;

/// Produces the stream a validator reads from.
///
/// Any `FnMut() -> io::Result<S>` closure is a factory.
pub trait StreamFactory {
    /// Stream type; closed on drop
    type Stream: AsyncRead + Unpin;

    /// Open a fresh stream positioned at the start of the input.
    fn open(&mut self) -> io::Result<Self::Stream>;
}

impl<S, F> StreamFactory for F
where
    F: FnMut() -> io::Result<S>,
    S: AsyncRead + Unpin,
{
    type Stream = S;

    fn open(&mut self) -> io::Result<S> {
        self()
    }
}

/// Limits applied while reading untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// Longest accepted frame
    pub max_frame_len: usize,
    /// Largest accepted decompressed payload
    pub max_plaintext_len: usize,
    /// Largest declared container length; checked before any stream is opened
    pub max_container_len: u64,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_plaintext_len: DEFAULT_MAX_PLAINTEXT_LEN,
            max_container_len: DEFAULT_MAX_CONTAINER_LEN,
        }
    }
}

/// Open one stream and read exactly `expected_len` bytes from it.
///
/// Bytes past `expected_len` are never requested. The stream is dropped before
/// this returns on every path.
///
/// # Errors
///
/// - `ReadError::Io` if opening or reading fails
/// - `ReadError::UnexpectedEof` if the stream ends early
pub(crate) async fn read_exact_len<F: StreamFactory>(
    factory: &mut F,
    expected_len: u64,
) -> Result<Vec<u8>, ReadError> {
    let mut stream = factory.open()?.take(expected_len);

    let mut buf = Vec::with_capacity(expected_len.min(MAX_PREALLOCATION) as usize);
    stream.read_to_end(&mut buf).await?;
    drop(stream);

    if (buf.len() as u64) < expected_len {
        tracing::debug!(expected_len, actual = buf.len(), "stream ended early");
        return Err(ReadError::UnexpectedEof);
    }

    debug_assert_eq!(buf.len() as u64, expected_len);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn reads_declared_length_only() {
        let mut factory = || -> io::Result<_> { Ok(Cursor::new(vec![7u8; 100])) };
        let bytes = read_exact_len(&mut factory, 40).await.expect("enough bytes");
        assert_eq!(bytes, vec![7u8; 40]);
    }

    #[tokio::test]
    async fn short_stream_is_unexpected_eof() {
        let mut factory = || -> io::Result<_> { Ok(Cursor::new(vec![7u8; 10])) };
        let result = read_exact_len(&mut factory, 11).await;
        assert!(matches!(result, Err(ReadError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn open_failure_is_io_error() {
        let mut factory = || -> io::Result<Cursor<Vec<u8>>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        };
        let result = read_exact_len(&mut factory, 1).await;
        assert!(
            matches!(result, Err(ReadError::Io(e)) if e.kind() == io::ErrorKind::PermissionDenied)
        );
    }

    #[test]
    fn default_limits() {
        let limits = ReadLimits::default();
        assert_eq!(limits.max_frame_len, 16 * 1024 * 1024);
        assert_eq!(limits.max_plaintext_len, 1 << 30);
        assert_eq!(limits.max_container_len, 1 << 30);
    }
}
