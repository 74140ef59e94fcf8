use crate::StreamError;

/// Byte range request as produced by an HTTP `Range` parser.
///
/// `length: None` means "to the end of the stream" (the `-1` convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HttpRange {
    /// First requested byte.
    pub start: u64,
    /// Number of requested bytes, or `None` for everything after `start`.
    pub length: Option<u64>,
}

impl HttpRange {
    /// Range of `length` bytes starting at `start`.
    pub fn new(start: u64, length: u64) -> Self {
        Self {
            start,
            length: Some(length),
        }
    }

    /// Range from `start` to the end of the stream.
    pub fn from_start(start: u64) -> Self {
        Self {
            start,
            length: None,
        }
    }

    /// The whole stream.
    pub fn full() -> Self {
        Self::from_start(0)
    }

    /// Builds a range from signed parser output, where a length of `-1` means "to end".
    ///
    /// A negative start or any other negative length is an [`StreamError::InvalidRange`].
    pub fn from_signed(start: i64, length: i64) -> Result<Self, StreamError> {
        let invalid = || StreamError::InvalidRange {
            start: start.max(0) as u64,
            length: 0,
            size: 0,
        };
        let start = u64::try_from(start).map_err(|_| invalid())?;
        let length = match length {
            -1 => None,
            length => Some(u64::try_from(length).map_err(|_| invalid())?),
        };
        Ok(Self { start, length })
    }

    /// Resolves the range against the declared object size.
    pub fn resolve(self, size: u64) -> Result<ResolvedRange, StreamError> {
        let length = self.length.unwrap_or_else(|| size.saturating_sub(self.start));
        let in_bounds = self
            .start
            .checked_add(length)
            .is_some_and(|end| end <= size);
        if !in_bounds {
            return Err(StreamError::InvalidRange {
                start: self.start,
                length,
                size,
            });
        }
        Ok(ResolvedRange {
            start: self.start,
            length,
        })
    }
}

/// Range with a concrete length, already checked against the object size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedRange {
    /// First byte.
    pub start: u64,
    /// Number of bytes.
    pub length: u64,
}

impl ResolvedRange {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    /// Value for an HTTP `Range` header, `None` for an empty range.
    pub fn header_value(&self) -> Option<String> {
        if self.length == 0 {
            return None;
        }
        Some(format!("bytes={}-{}", self.start, self.end() - 1))
    }
}
