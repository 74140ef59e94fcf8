use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::{
    BaseStream, HttpConfig, HttpRange, HttpRangeReader, Link, Obj, RandomAccessFile,
    RangeReadCloser, RangeReader, ResolvedRange, StreamError,
    io::with_cancel,
};

/// The one source that serves range reads, chosen at construction.
enum Backend {
    File(Arc<dyn RandomAccessFile>),
    Ranged(Arc<dyn RangeReadCloser>),
}

/// Stream with true random access, backed by a random-access file or a remote range reader.
///
/// Built from a [`BaseStream`] and an optional [`Link`]. Constructing it never
/// opens a remote connection; the first sequential read does.
pub struct SeekableStream {
    base: BaseStream,
    link: Option<Link>,
    backend: Backend,
}

impl SeekableStream {
    /// Resolves the backing source with default HTTP settings.
    pub fn new(base: BaseStream, link: Option<Link>) -> Result<Self, StreamError> {
        Self::with_http_config(base, link, &HttpConfig::default())
    }

    /// Resolves the backing source, in order: the base stream's own random-access
    /// file, the link's file, the link's range reader, a range reader built from
    /// the link URL.
    ///
    /// Fails with [`StreamError::IllegalStream`] when none apply.
    pub fn with_http_config(
        mut base: BaseStream,
        link: Option<Link>,
        http: &HttpConfig,
    ) -> Result<Self, StreamError> {
        if let Some(file) = base.random_access_file() {
            base.add_closer(Arc::clone(&file));
            debug!(name = base.name(), "seekable stream adopted random-access reader");
            return Ok(Self {
                base,
                link,
                backend: Backend::File(file),
            });
        }

        let Some(found) = link.as_ref() else {
            return Err(StreamError::IllegalStream);
        };
        let backend = if let Some(file) = &found.file {
            base.adopt_file(Arc::clone(file));
            base.add_closer(Arc::clone(file));
            debug!(name = base.name(), "seekable stream adopted link file");
            Backend::File(Arc::clone(file))
        } else if let Some(range_reader) = &found.range_reader {
            base.add_closer(Arc::clone(range_reader));
            debug!(name = base.name(), "seekable stream adopted link range reader");
            Backend::Ranged(Arc::clone(range_reader))
        } else if found.url.as_deref().is_some_and(|url| !url.is_empty()) {
            let reader = Arc::new(HttpRangeReader::from_link(base.size(), found, http)?);
            base.add_closer(Arc::clone(&reader));
            debug!(name = base.name(), url = reader.url(), "seekable stream reads link url");
            Backend::Ranged(reader)
        } else {
            return Err(StreamError::IllegalStream);
        };

        Ok(Self {
            base,
            link,
            backend,
        })
    }

    /// Underlying base stream.
    pub fn base(&self) -> &BaseStream {
        &self.base
    }

    /// Link the stream was built from.
    pub fn link(&self) -> Option<&Link> {
        self.link.as_ref()
    }

    /// Whether range reads are served by a random-access file rather than a remote reader.
    pub fn is_random_access(&self) -> bool {
        matches!(self.backend, Backend::File(_))
    }

    /// Object metadata.
    pub fn obj(&self) -> &Arc<dyn Obj> {
        self.base.obj()
    }

    /// Object name.
    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Declared size in bytes.
    pub fn size(&self) -> u64 {
        self.base.size()
    }

    /// MIME type, explicit or inferred from the name.
    pub fn mimetype(&self) -> &str {
        self.base.mimetype()
    }

    /// Whether the consumer must hand the stream to an asynchronous storage task.
    pub fn need_store(&self) -> bool {
        self.base.need_store()
    }

    /// Object already present at the destination, if known.
    pub fn exist(&self) -> Option<&Arc<dyn Obj>> {
        self.base.exist()
    }

    /// Records the object already present at the destination.
    pub fn set_exist(&mut self, obj: Option<Arc<dyn Obj>>) {
        self.base.set_exist(obj);
    }

    /// Reads the next chunk of the stream into `buf`, opening the remote
    /// reader on first use.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        AsyncReadExt::read(self, buf)
            .await
            .map_err(StreamError::from_io)
    }

    /// Returns a reader over `range` from the random-access file, the temp
    /// file, or the remote range reader, in that order.
    pub async fn range_read(&mut self, range: HttpRange) -> Result<RangeReader, StreamError> {
        if self.base.is_closed() {
            return Err(StreamError::Closed);
        }
        let range = range.resolve(self.base.size())?;
        match &self.backend {
            Backend::File(file) => file.section(range).await,
            Backend::Ranged(range_reader) => {
                if let Some(temp) = self.base.temp_file() {
                    return temp.section(range).await;
                }
                let cancel = self.base.cancel_token().clone();
                with_cancel(&cancel, range_reader.range_read(&cancel, range)).await
            }
        }
    }

    /// Returns the temp file or random-access file if one exists, otherwise
    /// copies the stream into a new temp file through sequential reads.
    pub async fn cache_full_in_temp_file(
        &mut self,
    ) -> Result<Arc<dyn RandomAccessFile>, StreamError> {
        if let Some(temp) = self.base.temp_file() {
            let temp: Arc<dyn RandomAccessFile> = temp;
            return Ok(temp);
        }
        if let Backend::File(file) = &self.backend {
            return Ok(Arc::clone(file));
        }
        self.attach_remote();
        self.base.cache_full_in_temp_file().await
    }

    /// Closes the adopted file or range reader, every other registered
    /// resource, and removes the temp file.
    pub async fn close(&mut self) -> Result<(), StreamError> {
        self.base.close().await
    }

    /// Attaches a full-stream reader from the remote range reader if no reader exists yet.
    fn attach_remote(&mut self) {
        if !self.base.is_detached() {
            return;
        }
        let Backend::Ranged(range_reader) = &self.backend else {
            return;
        };
        let range_reader = Arc::clone(range_reader);
        let cancel = self.base.cancel_token().clone();
        let range = ResolvedRange {
            start: 0,
            length: self.base.size(),
        };
        self.base.attach_opening(Box::pin(async move {
            with_cancel(&cancel, range_reader.range_read(&cancel, range)).await
        }));
    }
}

impl AsyncRead for SeekableStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.attach_remote();
        Pin::new(&mut this.base).poll_read(cx, buf)
    }
}

impl std::fmt::Debug for SeekableStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::File(_) => "file",
            Backend::Ranged(_) => "ranged",
        };
        f.debug_struct("SeekableStream")
            .field("base", &self.base)
            .field("link", &self.link)
            .field("backend", &backend)
            .finish()
    }
}
