use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::{
    BaseStream, Link, Obj, RandomAccessFile, RangeReader, SeekableStream, StreamConfig,
    StreamError,
    stream::source::{Live, Source},
};

enum Input {
    Reader(RangeReader),
    File(Arc<dyn RandomAccessFile>),
}

/// Builder for [`BaseStream`] and [`SeekableStream`].
pub struct StreamBuilder {
    obj: Arc<dyn Obj>,
    input: Option<Input>,
    mimetype: Option<String>,
    need_store: bool,
    exist: Option<Arc<dyn Obj>>,
    cancel: Option<CancellationToken>,
    config: StreamConfig,
}

impl StreamBuilder {
    /// Creates a builder for `obj` with default configuration.
    pub fn new(obj: impl Obj + 'static) -> Self {
        Self::from_obj(Arc::new(obj))
    }

    /// Creates a builder for shared object metadata.
    pub fn from_obj(obj: Arc<dyn Obj>) -> Self {
        Self {
            obj,
            input: None,
            mimetype: None,
            need_store: false,
            exist: None,
            cancel: None,
            config: StreamConfig::default(),
        }
    }

    /// Sets a sequential reader as the content source.
    pub fn reader(mut self, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.input = Some(Input::Reader(Box::new(reader)));
        self
    }

    /// Sets a random-access file as the content source.
    pub fn file(mut self, file: Arc<dyn RandomAccessFile>) -> Self {
        self.input = Some(Input::File(file));
        self
    }

    /// Sets the MIME type instead of inferring it from the object name.
    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Marks the stream for hand-off to an asynchronous storage task.
    pub fn need_store(mut self, need_store: bool) -> Self {
        self.need_store = need_store;
        self
    }

    /// Records the object already present at the destination.
    pub fn exist(mut self, obj: Arc<dyn Obj>) -> Self {
        self.exist = Some(obj);
        self
    }

    /// Sets the token that cancels remote calls for this stream.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Replaces the stream configuration.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the current configuration snapshot.
    pub fn config_ref(&self) -> &StreamConfig {
        &self.config
    }

    /// Builds a [`BaseStream`].
    pub fn build(self) -> Result<BaseStream, StreamError> {
        self.config.validate()?;
        let mimetype = match self.mimetype {
            Some(mimetype) if !mimetype.is_empty() => mimetype,
            _ => infer_mimetype(self.obj.name()),
        };
        let source = match self.input {
            Some(Input::Reader(reader)) => Source::Raw(Live::Open(reader)),
            Some(Input::File(file)) => Source::RandomAccess {
                file,
                live: Live::Idle,
            },
            None => Source::Detached,
        };
        Ok(BaseStream::from_parts(
            self.obj,
            mimetype,
            self.need_store,
            self.exist,
            self.cancel.unwrap_or_default(),
            self.config,
            source,
        ))
    }

    /// Builds a [`SeekableStream`], resolving its backing source from the
    /// configured input and `link`.
    pub fn build_seekable(self, link: Option<Link>) -> Result<SeekableStream, StreamError> {
        SeekableStream::new(self.build()?, link)
    }
}

/// Guesses a MIME type from a file name, falling back to `application/octet-stream`.
pub fn infer_mimetype(name: &str) -> String {
    let guess: mime::Mime = mime_guess::from_path(name).first_or_octet_stream();
    guess.essence_str().to_owned()
}
