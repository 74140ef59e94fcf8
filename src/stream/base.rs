use std::{
    io::{self, Cursor},
    mem,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::sync::CancellationToken;

use crate::{
    Closer, Closers, ErrorList, HttpRange, Obj, RandomAccessFile, RangeReader, StreamBuilder,
    StreamConfig, StreamError, TempFile,
    stream::source::{Live, OpenFuture, Source},
};

/// Sequential byte source plus object metadata, with peek caching and
/// on-demand materialization for range reads.
///
/// One owner drives a stream; every state transition takes `&mut self`.
pub struct BaseStream {
    obj: Arc<dyn Obj>,
    mimetype: String,
    need_store: bool,
    exist: Option<Arc<dyn Obj>>,
    cancel: CancellationToken,
    config: StreamConfig,
    source: Source,
    peek: Option<Bytes>,
    position: u64,
    closers: Closers,
}

impl BaseStream {
    /// Starts building a stream for `obj`.
    pub fn builder(obj: impl Obj + 'static) -> StreamBuilder {
        StreamBuilder::new(obj)
    }

    pub(crate) fn from_parts(
        obj: Arc<dyn Obj>,
        mimetype: String,
        need_store: bool,
        exist: Option<Arc<dyn Obj>>,
        cancel: CancellationToken,
        config: StreamConfig,
        source: Source,
    ) -> Self {
        Self {
            obj,
            mimetype,
            need_store,
            exist,
            cancel,
            config,
            source,
            peek: None,
            position: 0,
            closers: Closers::new(),
        }
    }

    /// Object metadata.
    pub fn obj(&self) -> &Arc<dyn Obj> {
        &self.obj
    }

    /// Object name.
    pub fn name(&self) -> &str {
        self.obj.name()
    }

    /// Declared size in bytes.
    pub fn size(&self) -> u64 {
        self.obj.size()
    }

    /// MIME type, explicit or inferred from the name.
    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    /// Parsed MIME type, `None` if the stored value is not a valid media type.
    pub fn mime(&self) -> Option<mime::Mime> {
        self.mimetype.parse().ok()
    }

    /// Whether the consumer must hand the stream to an asynchronous storage task.
    pub fn need_store(&self) -> bool {
        self.need_store
    }

    /// Object already present at the destination, if known.
    pub fn exist(&self) -> Option<&Arc<dyn Obj>> {
        self.exist.as_ref()
    }

    /// Records the object already present at the destination.
    pub fn set_exist(&mut self, obj: Option<Arc<dyn Obj>>) {
        self.exist = obj;
    }

    /// Token cancelling remote calls made on behalf of this stream.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stream settings.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Leading bytes buffered by a peeking range read.
    pub fn peek_cache(&self) -> Option<&Bytes> {
        self.peek.as_ref()
    }

    /// Full local copy, once materialized.
    pub fn temp_file(&self) -> Option<Arc<TempFile>> {
        match &self.source {
            Source::Materialized { file, .. } => Some(Arc::clone(file)),
            _ => None,
        }
    }

    /// Random-access file the stream was built from, if any.
    pub fn random_access_file(&self) -> Option<Arc<dyn RandomAccessFile>> {
        match &self.source {
            Source::RandomAccess { file, .. } => Some(Arc::clone(file)),
            _ => None,
        }
    }

    /// Bytes handed out by sequential reads since the current reader was attached.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        matches!(self.source, Source::Closed)
    }

    /// Takes ownership of `closer`; it is closed together with the stream.
    pub fn add_closer(&mut self, closer: impl Closer + 'static) {
        self.closers.add(closer);
    }

    /// Reads the next chunk of the stream into `buf`.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        AsyncReadExt::read(self, buf)
            .await
            .map_err(StreamError::from_io)
    }

    /// Copies the whole stream into a local temp file and serves every later
    /// read from it.
    ///
    /// Returns the existing temp file, or the random-access file the stream was
    /// built from, without copying. Materialization happens at most once.
    pub async fn cache_full_in_temp_file(
        &mut self,
    ) -> Result<Arc<dyn RandomAccessFile>, StreamError> {
        match &self.source {
            Source::Materialized { file, .. } => {
                let file: Arc<dyn RandomAccessFile> = file.clone();
                return Ok(file);
            }
            Source::RandomAccess { file, .. } => return Ok(Arc::clone(file)),
            Source::Closed => return Err(StreamError::Closed),
            Source::Detached => return Err(StreamError::RangeUnavailable),
            Source::Raw(_) | Source::Peeked(_) => {}
        }
        self.ensure_unconsumed()?;

        let (Source::Raw(live) | Source::Peeked(live)) =
            mem::replace(&mut self.source, Source::Detached)
        else {
            return Err(StreamError::RangeUnavailable);
        };
        let created = match live.into_reader().await {
            Ok(reader) => TempFile::create(&self.config.temp_dir, reader, self.size()).await,
            Err(err) => Err(err),
        };
        let file = match created {
            Ok(file) => Arc::new(file),
            Err(err) => {
                self.lose_source(&err);
                return Err(err);
            }
        };
        debug!(
            name = self.name(),
            path = %file.path().display(),
            size = file.size(),
            "materialized stream into temp file"
        );

        self.source = Source::Materialized {
            file: Arc::clone(&file),
            live: Live::Idle,
        };
        self.position = 0;
        let file: Arc<dyn RandomAccessFile> = file;
        Ok(file)
    }

    /// Returns a reader over `range`.
    ///
    /// Served from the peek cache when it covers the range. A range at offset 0
    /// within the peek limit creates the peek cache. Anything else is read from
    /// the random-access file or a materialized temp file.
    pub async fn range_read(&mut self, range: HttpRange) -> Result<RangeReader, StreamError> {
        if self.is_closed() {
            return Err(StreamError::Closed);
        }
        let range = range.resolve(self.size())?;
        if range.length == 0 {
            return Ok(Box::new(tokio::io::empty()));
        }

        if let Some(peek) = &self.peek {
            let cached = peek.len() as u64;
            if range.start < cached && range.end() <= cached {
                // both bounds fit in the cache, so they fit in usize
                let slice = peek.slice(range.start as usize..range.end() as usize);
                return Ok(Box::new(Cursor::new(slice)));
            }
        }

        if range.start == 0
            && range.length <= self.config.peek_limit
            && self.peek.is_none()
            && matches!(self.source, Source::Raw(_))
        {
            let cache = self.fill_peek(range.length).await?;
            return Ok(Box::new(Cursor::new(cache)));
        }

        let file = self.cache_full_in_temp_file().await?;
        file.section(range).await
    }

    /// Closes every registered resource and removes the temp file.
    ///
    /// Both steps always run; their failures are returned together. Calling
    /// it again is harmless.
    pub async fn close(&mut self) -> Result<(), StreamError> {
        let mut errors = ErrorList::new();
        errors.push_result(self.closers.close().await);
        if let Source::Materialized { file, .. } = mem::replace(&mut self.source, Source::Closed) {
            errors.push_result(file.remove().await);
        }
        self.peek = None;

        let result = errors.into_result();
        #[cfg(feature = "tracing")]
        if let Err(err) = &result {
            warn!(name = self.name(), error = %err, "failed to close stream");
        }
        result
    }

    pub(crate) fn is_detached(&self) -> bool {
        matches!(self.source, Source::Detached)
    }

    /// Attaches a reader that opens on first poll. No-op unless detached.
    pub(crate) fn attach_opening(&mut self, open: OpenFuture) {
        if self.is_detached() {
            self.source = Source::Raw(Live::Opening(open));
            self.position = 0;
        }
    }

    /// Makes `file` the live reader, replacing any sequential source.
    pub(crate) fn adopt_file(&mut self, file: Arc<dyn RandomAccessFile>) {
        self.source = Source::RandomAccess {
            file,
            live: Live::Idle,
        };
        self.position = 0;
    }

    /// Marks the sequential source as lost after `err` consumed it.
    fn lose_source(&mut self, err: &StreamError) {
        let reason = match err {
            StreamError::SourceLost { reason } => reason.clone(),
            other => other.to_string(),
        };
        self.source = Source::Raw(Live::Failed(reason));
    }

    fn ensure_unconsumed(&self) -> Result<(), StreamError> {
        if self.position != 0 {
            return Err(StreamError::SourceConsumed {
                position: self.position,
            });
        }
        Ok(())
    }

    async fn fill_peek(&mut self, length: u64) -> Result<Bytes, StreamError> {
        self.ensure_unconsumed()?;
        let Source::Raw(live) = mem::replace(&mut self.source, Source::Detached) else {
            return Err(StreamError::RangeUnavailable);
        };
        let mut rest = match live.into_reader().await {
            Ok(rest) => rest,
            Err(err) => {
                self.lose_source(&err);
                return Err(err);
            }
        };

        let mut buf = Vec::with_capacity(length as usize);
        let copied = (&mut rest).take(length).read_to_end(&mut buf).await;
        let actual = buf.len() as u64;
        let cache = Bytes::from(buf);
        let spliced: RangeReader = Box::new(Cursor::new(cache.clone()).chain(rest));

        if let Err(err) = copied {
            self.source = Source::Raw(Live::Open(spliced));
            return Err(StreamError::from_io(err));
        }
        if actual != length {
            self.source = Source::Raw(Live::Open(spliced));
            return Err(StreamError::ShortRead {
                expected: length,
                actual,
            });
        }

        debug!(name = self.name(), size = actual, "created peek cache");
        self.source = Source::Peeked(Live::Open(spliced));
        self.peek = Some(cache.clone());
        Ok(cache)
    }
}

impl AsyncRead for BaseStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let result = ready!(this.source.poll_read(cx, buf));
        this.position += (buf.filled().len() - before) as u64;
        Poll::Ready(result)
    }
}

impl std::fmt::Debug for BaseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.source {
            Source::Detached => "detached",
            Source::Raw(Live::Failed(_)) => "failed",
            Source::Raw(_) => "raw",
            Source::Peeked(_) => "peeked",
            Source::RandomAccess { .. } => "random-access",
            Source::Materialized { .. } => "materialized",
            Source::Closed => "closed",
        };
        f.debug_struct("BaseStream")
            .field("obj", &self.obj)
            .field("mimetype", &self.mimetype)
            .field("need_store", &self.need_store)
            .field("state", &state)
            .field("peek", &self.peek.as_ref().map(Bytes::len))
            .field("position", &self.position)
            .field("closers", &self.closers.len())
            .finish()
    }
}
