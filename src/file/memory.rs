use std::io::Cursor;

use bytes::Bytes;

use crate::{Closer, RandomAccessFile, RangeReader, ResolvedRange, StreamError, file::check_bounds};

/// Random-access file over an in-process buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFile {
    data: Bytes,
}

impl MemoryFile {
    /// Wraps `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns the backing bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Returns a cheap slice of the backing bytes.
    pub fn slice(&self, range: ResolvedRange) -> Result<Bytes, StreamError> {
        check_bounds(range, self.size())?;
        let start = to_usize(range.start)?;
        let end = to_usize(range.end())?;
        Ok(self.data.slice(start..end))
    }
}

impl Closer for MemoryFile {}

#[async_trait::async_trait]
impl RandomAccessFile for MemoryFile {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn section(&self, range: ResolvedRange) -> Result<RangeReader, StreamError> {
        Ok(Box::new(Cursor::new(self.slice(range)?)))
    }
}

fn to_usize(value: u64) -> Result<usize, StreamError> {
    usize::try_from(value).map_err(|_| StreamError::InvalidRange {
        start: value,
        length: 0,
        size: usize::MAX as u64,
    })
}
