#![allow(dead_code)]

use std::{
    io::{self, Cursor},
    path::{Path, PathBuf},
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    task::{Context, Poll, ready},
};

use seekstream::{
    Closer, MemoryFile, RandomAccessFile, RangeReadCloser, RangeReader, ResolvedRange,
    StreamError,
};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * 1024;

/// Sequential reader that counts the bytes pulled out of it.
#[derive(Debug)]
pub struct CountingReader {
    inner: Cursor<Vec<u8>>,
    read: Arc<AtomicU64>,
}

impl CountingReader {
    pub fn new(data: Vec<u8>) -> (Self, Arc<AtomicU64>) {
        let read = Arc::new(AtomicU64::new(0));
        (
            Self {
                inner: Cursor::new(data),
                read: Arc::clone(&read),
            },
            read,
        )
    }
}

impl AsyncRead for CountingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        this.read
            .fetch_add((buf.filled().len() - before) as u64, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Range reader over an in-memory buffer that records every request.
#[derive(Debug)]
pub struct RecordingRangeReader {
    data: MemoryFile,
    requests: Mutex<Vec<ResolvedRange>>,
    closed: AtomicUsize,
    fail_open: bool,
}

impl RecordingRangeReader {
    pub fn new(data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            data: MemoryFile::new(data),
            requests: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
            fail_open: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            data: MemoryFile::default(),
            requests: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
            fail_open: true,
        })
    }

    pub fn requests(&self) -> Vec<ResolvedRange> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Closer for RecordingRangeReader {
    async fn close(&self) -> Result<(), StreamError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RangeReadCloser for RecordingRangeReader {
    async fn range_read(
        &self,
        _cancel: &CancellationToken,
        range: ResolvedRange,
    ) -> Result<RangeReader, StreamError> {
        self.requests.lock().expect("requests lock").push(range);
        if self.fail_open {
            return Err(StreamError::Http {
                status: 503,
                url: "mock://unavailable".to_owned(),
            });
        }
        self.data.section(range).await
    }
}

/// Closer that counts calls and optionally fails.
#[derive(Debug, Default)]
pub struct CountingCloser {
    closed: AtomicUsize,
    fail: bool,
}

impl CountingCloser {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            closed: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Closer for CountingCloser {
    async fn close(&self) -> Result<(), StreamError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StreamError::Io(io::Error::other("closer failed")));
        }
        Ok(())
    }
}

/// Deterministic, non-repeating-per-page test content.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub async fn read_all(mut reader: RangeReader) -> Vec<u8> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .await
        .expect("reader should drain");
    out
}

pub fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("seekstream-test-{}", Uuid::new_v4()))
}

pub fn entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|dir| dir.count()).unwrap_or(0)
}

pub async fn cleanup(path: PathBuf) {
    let _ = tokio::fs::remove_dir_all(path).await;
}
