#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core crate surface for `seekstream`: file streams with sequential reads,
//! peek caching, temp-file materialization and byte-range reads over
//! in-memory, local and remote content.

#[macro_use]
mod trace;

/// Fluent stream builder.
pub mod builder;
/// Ownership of resources released on close.
pub mod closer;
/// Stream and HTTP configuration.
pub mod config;
/// Error types exposed by this crate.
pub mod error;
/// Random-access files: local, temporary and in-memory.
pub mod file;
/// Cancellation helpers for async reads.
pub mod io;
/// Object metadata and links.
pub mod model;
/// Reversible obfuscation of stored secrets.
pub mod obfs;
/// Byte ranges.
pub mod range;
/// Remote range readers.
pub mod remote;
/// Stream types.
pub mod stream;

pub use builder::{StreamBuilder, infer_mimetype};
pub use closer::{Closer, Closers};
pub use config::{HttpConfig, IN_MEMORY_BUF_MAX_SIZE, IN_MEMORY_BUF_MAX_SIZE_BYTES, StreamConfig};
pub use error::{ConfigError, ErrorList, RevealError, StreamError};
pub use file::{LocalFile, MemoryFile, RandomAccessFile, RangeReader, TempFile};
pub use model::{Link, Obj, Object};
pub use obfs::{OBFUSCATED_PREFIX, ObfusText, is_obfuscated, obfuscate, reveal};
pub use range::{HttpRange, ResolvedRange};
pub use remote::{FnRangeReader, HttpRangeReader, RangeReadCloser};
pub use stream::{BaseStream, FileStreamer, SeekableStream};
