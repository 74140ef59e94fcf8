//! Remote range readers.

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::{Closer, RangeReader, ResolvedRange, StreamError};

/// Range reader built from a link URL.
pub mod http;

pub use http::HttpRangeReader;

/// Remote resource that can produce a reader for any byte range.
#[async_trait::async_trait]
pub trait RangeReadCloser: Closer {
    /// Opens a reader yielding exactly `range.length` bytes starting at `range.start`.
    async fn range_read(
        &self,
        cancel: &CancellationToken,
        range: ResolvedRange,
    ) -> Result<RangeReader, StreamError>;
}

type RangeFn =
    dyn Fn(CancellationToken, ResolvedRange) -> BoxFuture<'static, Result<RangeReader, StreamError>>
        + Send
        + Sync;

/// Range reader backed by a closure, for drivers that only expose a fetch function.
#[derive(Clone)]
pub struct FnRangeReader {
    read: Arc<RangeFn>,
}

impl FnRangeReader {
    /// Wraps `read`, which is called once per range request.
    pub fn new<F>(read: F) -> Self
    where
        F: Fn(CancellationToken, ResolvedRange) -> BoxFuture<'static, Result<RangeReader, StreamError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            read: Arc::new(read),
        }
    }
}

impl fmt::Debug for FnRangeReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRangeReader").finish_non_exhaustive()
    }
}

impl Closer for FnRangeReader {}

#[async_trait::async_trait]
impl RangeReadCloser for FnRangeReader {
    async fn range_read(
        &self,
        cancel: &CancellationToken,
        range: ResolvedRange,
    ) -> Result<RangeReader, StreamError> {
        (self.read)(cancel.clone(), range).await
    }
}
