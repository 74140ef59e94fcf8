use std::{fmt, sync::Arc, time::SystemTime};

use http::HeaderMap;

use crate::{RandomAccessFile, RangeReadCloser};

/// Metadata of a stored object, supplied by the storage layer.
pub trait Obj: Send + Sync + fmt::Debug {
    /// Object name, used for MIME inference.
    fn name(&self) -> &str;
    /// Declared size in bytes. Authoritative for range resolution.
    fn size(&self) -> u64;
    /// Backend-specific identifier.
    fn id(&self) -> &str {
        ""
    }
    /// Path of the object inside its storage.
    fn path(&self) -> &str {
        ""
    }
    /// Last modification time, when known.
    fn modified(&self) -> Option<SystemTime> {
        None
    }
    /// Whether the object is a directory.
    fn is_dir(&self) -> bool {
        false
    }
}

/// Plain object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    /// Backend-specific identifier.
    pub id: String,
    /// Object name.
    pub name: String,
    /// Path inside the storage.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Directory flag.
    pub is_dir: bool,
}

impl Object {
    /// Creates file metadata from a name and a size.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Self::default()
        }
    }
}

impl Obj for Object {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }
}

/// Remote resource handle produced by a storage driver.
///
/// Any subset may be populated; [`crate::SeekableStream::new`] prefers `file`,
/// then `range_reader`, then `url`.
#[derive(Clone, Default)]
pub struct Link {
    /// Direct download URL.
    pub url: Option<String>,
    /// Headers sent with every request to `url`.
    pub header: HeaderMap,
    /// Ready-made random-access file.
    pub file: Option<Arc<dyn RandomAccessFile>>,
    /// Ready-made range reader.
    pub range_reader: Option<Arc<dyn RangeReadCloser>>,
}

impl Link {
    /// Link pointing at a URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Link carrying a random-access file.
    pub fn from_file(file: Arc<dyn RandomAccessFile>) -> Self {
        Self {
            file: Some(file),
            ..Self::default()
        }
    }

    /// Link carrying a range reader.
    pub fn from_range_reader(range_reader: Arc<dyn RangeReadCloser>) -> Self {
        Self {
            range_reader: Some(range_reader),
            ..Self::default()
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("url", &self.url)
            .field("header", &self.header)
            .field("file", &self.file.is_some())
            .field("range_reader", &self.range_reader.is_some())
            .finish()
    }
}
