use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Error type used by `seekstream`.
#[derive(Debug, Error)]
pub enum StreamError {
    /// No random-access file, range closer or URL could back the stream.
    #[error("illegal seekable stream: no usable backing source")]
    IllegalStream,
    /// A bounded copy yielded fewer bytes than the declared range or size.
    #[error("stream did not yield all data, expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Number of bytes requested.
        expected: u64,
        /// Number of bytes actually produced by the source.
        actual: u64,
    },
    /// Neither a random-access source, a temp file nor a range closer is available.
    #[error("can't find a random-access file or range reader for this stream")]
    RangeUnavailable,
    /// The requested range does not fit inside the declared object size.
    #[error("range start {start} length {length} exceeds object size {size}")]
    InvalidRange {
        /// First requested byte.
        start: u64,
        /// Requested length in bytes.
        length: u64,
        /// Declared object size.
        size: u64,
    },
    /// Sequential reads already consumed bytes of a non-seekable source.
    #[error("sequential source already consumed {position} bytes, cannot rewind")]
    SourceConsumed {
        /// Bytes handed out by sequential reads so far.
        position: u64,
    },
    /// An earlier failure consumed or broke the sequential source.
    #[error("sequential source is unusable after an earlier failure: {reason}")]
    SourceLost {
        /// Message of the failure that lost the source.
        reason: String,
    },
    /// The stream was closed.
    #[error("stream is closed")]
    Closed,
    /// The stream's cancellation token fired during a remote call.
    #[error("stream operation cancelled")]
    Cancelled,
    /// Remote server answered with a non-success status.
    #[error("remote range request to {url} failed with status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },
    /// Transport failure while talking to the remote server.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The materialized temp file could not be deleted.
    #[error("failed to remove temp file [{}]: {source}", .path.display())]
    RemoveTempFile {
        /// Location of the temp file.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// Invalid stream configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// I/O failure on a local or remote reader.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Several independent failures, usually from closing resources.
    #[error("{0}")]
    Multiple(ErrorList),
}

impl StreamError {
    /// Converts a reader-level I/O error back into a stream error, unwrapping
    /// stream errors that were boxed into `io::Error` on the way out.
    pub(crate) fn from_io(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<StreamError>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(stream_err) = inner.downcast::<StreamError>() {
                    return *stream_err;
                }
            }
            return Self::Io(io::Error::other("stream error"));
        }
        Self::Io(err)
    }

    pub(crate) fn into_io(self) -> io::Error {
        match self {
            Self::Io(err) => err,
            other => io::Error::other(other),
        }
    }
}

/// Collection of errors gathered without short-circuiting.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<StreamError>,
}

impl ErrorList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error of a result, if any. Nested lists are flattened.
    pub fn push_result(&mut self, result: Result<(), StreamError>) {
        if let Err(err) = result {
            self.push(err);
        }
    }

    /// Records an error. Nested lists are flattened.
    pub fn push(&mut self, err: StreamError) {
        match err {
            StreamError::Multiple(list) => self.errors.extend(list.errors),
            other => self.errors.push(other),
        }
    }

    /// Returns the recorded errors in insertion order.
    pub fn errors(&self) -> &[StreamError] {
        &self.errors
    }

    /// Returns the number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` when nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Collapses the list: no errors is `Ok`, one error is returned as is.
    pub fn into_result(mut self) -> Result<(), StreamError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(StreamError::Multiple(self)),
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Creates a configuration error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure to reveal an obfuscated value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevealError {
    /// The payload after the marker is not valid base64.
    #[error("base64 decode failed when revealing password - is it obscured?")]
    Base64,
    /// The payload is shorter than the cipher IV.
    #[error("input too short when revealing password - is it obscured?")]
    TooShort,
    /// The decrypted value is not UTF-8.
    #[error("revealed password is not valid UTF-8")]
    Utf8,
}
