use std::{
    future::Future,
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};

use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf, Take};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::{RangeReader, StreamError};

/// Races `fut` against `token`, failing with [`StreamError::Cancelled`] if the token fires first.
pub async fn with_cancel<T, F>(token: &CancellationToken, fut: F) -> Result<T, StreamError>
where
    F: Future<Output = Result<T, StreamError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StreamError::Cancelled),
        result = fut => result,
    }
}

/// Reader that fails once its cancellation token fires.
#[pin_project]
pub struct CancellableReader<R> {
    #[pin]
    inner: R,
    #[pin]
    cancelled: WaitForCancellationFutureOwned,
}

impl<R> CancellableReader<R> {
    /// Wraps `inner` so reads stop when `token` is cancelled.
    pub fn new(inner: R, token: CancellationToken) -> Self {
        Self {
            inner,
            cancelled: token.cancelled_owned(),
        }
    }
}

impl<R> CancellableReader<R>
where
    R: AsyncRead + Send + 'static,
{
    /// Boxes the reader into a [`RangeReader`].
    pub fn boxed(inner: R, token: CancellationToken) -> RangeReader {
        Box::new(Box::pin(Self::new(inner, token)))
    }
}

impl<R> AsyncRead for CancellableReader<R>
where
    R: AsyncRead,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        if this.cancelled.poll(cx).is_ready() {
            return Poll::Ready(Err(StreamError::Cancelled.into_io()));
        }
        this.inner.poll_read(cx, buf)
    }
}

/// Reader yielding exactly `expected` bytes of `inner`.
///
/// An early end of `inner` fails with [`StreamError::ShortRead`] instead of a
/// clean EOF.
#[pin_project]
pub struct ExactReader<R> {
    #[pin]
    inner: Take<R>,
    expected: u64,
    read: u64,
}

impl<R> ExactReader<R>
where
    R: AsyncRead,
{
    /// Limits `inner` to `expected` bytes and requires all of them.
    pub fn new(inner: R, expected: u64) -> Self {
        Self {
            inner: inner.take(expected),
            expected,
            read: 0,
        }
    }
}

impl<R> AsyncRead for ExactReader<R>
where
    R: AsyncRead,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let before = buf.filled().len();
        ready!(this.inner.poll_read(cx, buf))?;
        let filled = (buf.filled().len() - before) as u64;
        *this.read += filled;
        if filled == 0 && buf.remaining() > 0 && *this.read < *this.expected {
            return Poll::Ready(Err(StreamError::ShortRead {
                expected: *this.expected,
                actual: *this.read,
            }
            .into_io()));
        }
        Poll::Ready(Ok(()))
    }
}
