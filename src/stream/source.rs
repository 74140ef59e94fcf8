use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, ReadBuf};

use crate::{RandomAccessFile, RangeReader, ResolvedRange, StreamError, TempFile};

pub(crate) type OpenFuture = BoxFuture<'static, Result<RangeReader, StreamError>>;

/// Sequential reader of a source, opened on first poll when it is backed by a file.
pub(crate) enum Live {
    Idle,
    Opening(OpenFuture),
    Open(RangeReader),
    /// Opening or draining the reader failed; the source is gone.
    Failed(String),
}

impl Live {
    fn poll_read(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
        open: impl FnOnce() -> Option<OpenFuture>,
    ) -> Poll<io::Result<()>> {
        let mut open = Some(open);
        loop {
            match self {
                Live::Idle => {
                    let Some(fut) = open.take().and_then(|open| open()) else {
                        return Poll::Ready(Err(StreamError::RangeUnavailable.into_io()));
                    };
                    *self = Live::Opening(fut);
                }
                Live::Opening(fut) => {
                    let opened = ready!(fut.as_mut().poll(cx));
                    match opened {
                        Ok(reader) => *self = Live::Open(reader),
                        Err(err) => {
                            *self = Live::Failed(err.to_string());
                            return Poll::Ready(Err(err.into_io()));
                        }
                    }
                }
                Live::Open(reader) => return Pin::new(reader).poll_read(cx, buf),
                Live::Failed(reason) => {
                    return Poll::Ready(Err(StreamError::SourceLost {
                        reason: reason.clone(),
                    }
                    .into_io()));
                }
            }
        }
    }

    pub(crate) async fn into_reader(self) -> Result<RangeReader, StreamError> {
        match self {
            Live::Idle => Err(StreamError::RangeUnavailable),
            Live::Opening(fut) => fut.await,
            Live::Open(reader) => Ok(reader),
            Live::Failed(reason) => Err(StreamError::SourceLost { reason }),
        }
    }
}

/// Where sequential reads of a stream come from.
///
/// `Materialized` is only left for `Closed`, and `Closed` is terminal.
pub(crate) enum Source {
    /// No reader attached yet.
    Detached,
    /// The original sequential reader.
    Raw(Live),
    /// Peek cache followed by the rest of the original reader.
    Peeked(Live),
    /// A file that serves any range directly.
    RandomAccess {
        file: Arc<dyn RandomAccessFile>,
        live: Live,
    },
    /// Full local copy; the original reader is gone.
    Materialized { file: Arc<TempFile>, live: Live },
    Closed,
}

impl Source {
    pub(crate) fn poll_read(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self {
            Source::Detached => Poll::Ready(Err(StreamError::RangeUnavailable.into_io())),
            Source::Closed => Poll::Ready(Err(StreamError::Closed.into_io())),
            Source::Raw(live) | Source::Peeked(live) => live.poll_read(cx, buf, || None),
            Source::RandomAccess { file, live } => {
                live.poll_read(cx, buf, || Some(open_full(Arc::clone(file))))
            }
            Source::Materialized { file, live } => {
                live.poll_read(cx, buf, || Some(open_full(file.clone())))
            }
        }
    }
}

fn open_full(file: Arc<dyn RandomAccessFile>) -> OpenFuture {
    Box::pin(async move {
        let range = ResolvedRange {
            start: 0,
            length: file.size(),
        };
        file.section(range).await
    })
}
