//! Instrumented streams.
//!
//! Validators promise to open one stream per call and to close it on every
//! path. [`tracked_factory`] counts both so tests can hold them to it, and
//! [`FaultyStream`] fails partway through to exercise the error paths.

use std::{
    io,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

/// Error injected by [`FaultyStream`].
///
/// Carried inside an [`io::Error`]; recover it with `get_ref` and
/// `downcast_ref`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("injected stream fault")]
pub struct InjectedFault;

/// Shared open and close counts for streams from one factory.
#[derive(Debug, Clone, Default)]
pub struct StreamCounters {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl StreamCounters {
    /// Streams handed out so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams dropped so far
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wrap `inner` and count it as opened.
    pub fn track<S>(&self, inner: S) -> TrackedStream<S> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        TrackedStream { inner, closed: Arc::clone(&self.closed) }
    }
}

/// Stream wrapper that records its own drop.
#[derive(Debug)]
pub struct TrackedStream<S> {
    inner: S,
    closed: Arc<AtomicUsize>,
}

impl<S: AsyncRead + Unpin> AsyncRead for TrackedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S> Drop for TrackedStream<S> {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Yields `prefix`, then fails every read with [`InjectedFault`].
#[derive(Debug, Clone)]
pub struct FaultyStream {
    prefix: Vec<u8>,
    pos: usize,
}

impl FaultyStream {
    /// Stream that fails after `prefix` has been read.
    pub fn new(prefix: Vec<u8>) -> Self {
        Self { prefix, pos: 0 }
    }
}

impl AsyncRead for FaultyStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = &this.prefix[this.pos..];
        if remaining.is_empty() {
            return Poll::Ready(Err(io::Error::other(InjectedFault)));
        }

        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

/// Factory serving `data` from memory, with counters.
pub fn tracked_factory(
    data: Vec<u8>,
) -> (impl FnMut() -> io::Result<TrackedStream<io::Cursor<Vec<u8>>>>, StreamCounters) {
    let counters = StreamCounters::default();
    let handle = counters.clone();
    let factory = move || Ok(handle.track(io::Cursor::new(data.clone())));
    (factory, counters)
}

/// Factory whose streams yield `prefix` and then fault, with counters.
pub fn faulty_factory(
    prefix: Vec<u8>,
) -> (impl FnMut() -> io::Result<TrackedStream<FaultyStream>>, StreamCounters) {
    let counters = StreamCounters::default();
    let handle = counters.clone();
    let factory = move || Ok(handle.track(FaultyStream::new(prefix.clone())));
    (factory, counters)
}

/// Factory that cannot open anything.
pub fn failing_factory() -> impl FnMut() -> io::Result<io::Cursor<Vec<u8>>> {
    || Err(io::Error::other(InjectedFault))
}

/// Whether `err` carries an [`InjectedFault`].
pub fn is_injected(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.downcast_ref::<InjectedFault>().is_some())
}
