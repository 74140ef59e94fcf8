//! Random-access backing files.

use tokio::io::AsyncRead;

use crate::{Closer, ResolvedRange, StreamError};

/// Local materialization and on-disk files.
pub mod local;
/// In-process byte buffers.
pub mod memory;

pub use local::{LocalFile, TempFile};
pub use memory::MemoryFile;

/// Owned reader handed out by range and sequential reads.
pub type RangeReader = Box<dyn AsyncRead + Send + Unpin>;

/// File that can serve any byte range without disturbing other readers.
#[async_trait::async_trait]
pub trait RandomAccessFile: Closer {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Returns an independent reader over `range`.
    async fn section(&self, range: ResolvedRange) -> Result<RangeReader, StreamError>;
}

pub(crate) fn check_bounds(range: ResolvedRange, size: u64) -> Result<(), StreamError> {
    if range.start.checked_add(range.length).is_some_and(|end| end <= size) {
        return Ok(());
    }
    Err(StreamError::InvalidRange {
        start: range.start,
        length: range.length,
        size,
    })
}
