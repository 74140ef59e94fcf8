#![allow(missing_docs)]

mod common;

use std::{io::Cursor, sync::Arc, sync::atomic::Ordering};

use bytes::Bytes;
use common::{
    CountingCloser, CountingReader, KIB, MIB, cleanup, entries, pattern, read_all, temp_root,
};
use seekstream::{
    BaseStream, HttpRange, IN_MEMORY_BUF_MAX_SIZE_BYTES, MemoryFile, Object, RandomAccessFile,
    StreamBuilder, StreamConfig, StreamError,
};
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn peek_serves_later_prefix_reads_without_touching_source() {
    let root = temp_root();
    let data = pattern(20 * MIB);
    let (reader, pulled) = CountingReader::new(data.clone());
    let mut stream = StreamBuilder::new(Object::new("big.bin", data.len() as u64))
        .reader(reader)
        .config(StreamConfig::with_temp_dir(&root))
        .build()
        .expect("builder should succeed");

    let head = stream
        .range_read(HttpRange::new(0, MIB as u64))
        .await
        .expect("peek range");
    assert_eq!(read_all(head).await, &data[..MIB]);
    assert_eq!(stream.peek_cache().map(Bytes::len), Some(MIB));
    let after_peek = pulled.load(Ordering::SeqCst);
    assert_eq!(after_peek, MIB as u64);

    let half = stream
        .range_read(HttpRange::new(0, 512 * KIB as u64))
        .await
        .expect("cached range");
    assert_eq!(read_all(half).await, &data[..512 * KIB]);
    assert_eq!(pulled.load(Ordering::SeqCst), after_peek);
    assert!(stream.temp_file().is_none());

    let mut all = Vec::new();
    stream.read_to_end(&mut all).await.expect("sequential read");
    assert_eq!(all.len(), data.len());
    assert!(all == data);

    stream.close().await.expect("close should succeed");
    assert_eq!(entries(&root), 0);
    cleanup(root).await;
}

#[tokio::test]
async fn range_outside_peek_materializes_and_close_removes_temp_file() {
    let root = temp_root();
    let data = pattern(5 * MIB);
    let mut stream = sequential_stream("movie.mp4", data.clone(), &root);

    let tail = stream
        .range_read(HttpRange::new(4 * MIB as u64, MIB as u64))
        .await
        .expect("range read");
    assert_eq!(read_all(tail).await, &data[4 * MIB..]);

    let path = stream
        .temp_file()
        .expect("temp file after materialization")
        .path()
        .to_path_buf();
    assert!(path.starts_with(&root));
    let metadata = tokio::fs::metadata(&path).await.expect("temp file metadata");
    assert_eq!(metadata.len(), data.len() as u64);

    let mut all = Vec::new();
    stream.read_to_end(&mut all).await.expect("sequential read");
    assert!(all == data);

    stream.close().await.expect("close should succeed");
    assert!(!path.exists());
    cleanup(root).await;
}

#[tokio::test]
async fn materializes_at_most_once() {
    let root = temp_root();
    let data = pattern(64 * KIB);
    let mut stream = sequential_stream("notes.txt", data.clone(), &root);

    let file = stream
        .cache_full_in_temp_file()
        .await
        .expect("materialize");
    assert_eq!(file.size(), data.len() as u64);
    let first = stream.temp_file().expect("temp file").path().to_path_buf();

    let middle = stream
        .range_read(HttpRange::new(100, 50))
        .await
        .expect("range from temp file");
    assert_eq!(read_all(middle).await, &data[100..150]);

    let head = stream
        .range_read(HttpRange::new(0, 16))
        .await
        .expect("prefix from temp file");
    assert_eq!(read_all(head).await, &data[..16]);
    assert!(stream.peek_cache().is_none());

    stream
        .cache_full_in_temp_file()
        .await
        .expect("second materialize");
    let second = stream.temp_file().expect("temp file").path().to_path_buf();
    assert_eq!(first, second);
    assert_eq!(entries(&root), 1);

    stream.close().await.expect("close should succeed");
    assert_eq!(entries(&root), 0);
    cleanup(root).await;
}

#[tokio::test]
async fn sequential_read_after_peek_yields_whole_stream() {
    let root = temp_root();
    let mut stream = sequential_stream("hello.txt", b"hello world".to_vec(), &root);

    let head = stream
        .range_read(HttpRange::new(0, 5))
        .await
        .expect("peek");
    assert_eq!(read_all(head).await, b"hello");

    let mut all = String::new();
    stream
        .read_to_string(&mut all)
        .await
        .expect("sequential read");
    assert_eq!(all, "hello world");

    let again = stream
        .range_read(HttpRange::new(1, 3))
        .await
        .expect("peek hit after draining");
    assert_eq!(read_all(again).await, b"ell");
    stream.close().await.expect("close");
    cleanup(root).await;
}

#[tokio::test]
async fn range_after_partial_sequential_read_is_rejected() {
    let root = temp_root();
    let mut stream = sequential_stream("log.txt", b"0123456789".to_vec(), &root);

    let mut buf = [0u8; 4];
    let read = stream.read(&mut buf).await.expect("sequential read");
    assert_eq!(read, 4);
    assert_eq!(stream.position(), 4);

    let err = stream
        .range_read(HttpRange::new(6, 3))
        .await
        .err()
        .expect("consumed source cannot be materialized");
    assert!(matches!(err, StreamError::SourceConsumed { position: 4 }));

    let err = stream
        .range_read(HttpRange::new(0, 2))
        .await
        .err()
        .expect("consumed source cannot be peeked");
    assert!(matches!(err, StreamError::SourceConsumed { position: 4 }));

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.expect("rest");
    assert_eq!(rest, b"456789");
    stream.close().await.expect("close");
    cleanup(root).await;
}

#[tokio::test]
async fn random_access_source_skips_peek_and_temp_file() {
    let root = temp_root();
    let data = pattern(4 * KIB);
    let mut stream = StreamBuilder::new(Object::new("blob.bin", data.len() as u64))
        .file(Arc::new(MemoryFile::new(data.clone())))
        .config(StreamConfig::with_temp_dir(&root))
        .build()
        .expect("builder should succeed");

    let head = stream
        .range_read(HttpRange::new(0, 128))
        .await
        .expect("range read");
    assert_eq!(read_all(head).await, &data[..128]);
    let tail = stream
        .range_read(HttpRange::from_start(4000))
        .await
        .expect("open range");
    assert_eq!(read_all(tail).await, &data[4000..]);
    assert!(stream.peek_cache().is_none());

    let file = stream
        .cache_full_in_temp_file()
        .await
        .expect("random access file");
    assert_eq!(file.size(), data.len() as u64);
    assert!(stream.temp_file().is_none());
    assert_eq!(entries(&root), 0);

    let mut all = Vec::new();
    stream.read_to_end(&mut all).await.expect("sequential read");
    assert_eq!(all, data);
    stream.close().await.expect("close");
    cleanup(root).await;
}

#[tokio::test]
async fn empty_and_out_of_bounds_ranges() {
    let root = temp_root();
    let mut stream = sequential_stream("a.bin", b"abcdef".to_vec(), &root);

    let empty = stream
        .range_read(HttpRange::new(3, 0))
        .await
        .expect("empty range");
    assert!(read_all(empty).await.is_empty());
    assert!(stream.peek_cache().is_none());
    assert!(stream.temp_file().is_none());

    let err = stream
        .range_read(HttpRange::new(4, 5))
        .await
        .err()
        .expect("range past end");
    assert!(matches!(
        err,
        StreamError::InvalidRange {
            start: 4,
            length: 5,
            size: 6
        }
    ));
    stream.close().await.expect("close");
    cleanup(root).await;
}

#[tokio::test]
async fn short_peek_keeps_the_bytes_it_read() {
    let root = temp_root();
    let mut stream = StreamBuilder::new(Object::new("short.bin", 100))
        .reader(Cursor::new(pattern(40)))
        .config(StreamConfig::with_temp_dir(&root))
        .build()
        .expect("builder should succeed");

    let err = stream
        .range_read(HttpRange::new(0, 60))
        .await
        .err()
        .expect("source is shorter than the range");
    assert!(matches!(
        err,
        StreamError::ShortRead {
            expected: 60,
            actual: 40
        }
    ));
    assert!(stream.peek_cache().is_none());

    let mut all = Vec::new();
    stream.read_to_end(&mut all).await.expect("sequential read");
    assert_eq!(all, pattern(40));
    stream.close().await.expect("close");
    cleanup(root).await;
}

#[tokio::test]
async fn short_source_leaves_no_temp_file() {
    let root = temp_root();
    let mut stream = StreamBuilder::new(Object::new("short.bin", 100))
        .reader(Cursor::new(pattern(40)))
        .config(StreamConfig::with_temp_dir(&root))
        .build()
        .expect("builder should succeed");

    let err = stream
        .range_read(HttpRange::new(50, 10))
        .await
        .err()
        .expect("materialization must fail");
    assert!(matches!(
        err,
        StreamError::ShortRead {
            expected: 100,
            actual: 40
        }
    ));
    assert!(stream.temp_file().is_none());
    assert_eq!(entries(&root), 0);

    let err = stream
        .range_read(HttpRange::new(50, 10))
        .await
        .err()
        .expect("source is gone");
    match err {
        StreamError::SourceLost { reason } => assert!(reason.contains("expected 100")),
        other => panic!("expected lost source, got {other:?}"),
    }
    let mut buf = [0u8; 8];
    let err = stream.read(&mut buf).await.expect_err("sequential read");
    assert!(matches!(err, StreamError::SourceLost { .. }));
    assert_eq!(entries(&root), 0);
    stream.close().await.expect("close");
    cleanup(root).await;
}

#[tokio::test]
async fn peek_limit_boundary_decides_between_cache_and_temp_file() {
    let root = temp_root();
    let cap = IN_MEMORY_BUF_MAX_SIZE_BYTES;
    let data = pattern(cap as usize + 2 * MIB);

    let mut stream = sequential_stream("edge.bin", data.clone(), &root);
    let head = stream
        .range_read(HttpRange::new(0, cap))
        .await
        .expect("range at the limit");
    assert_eq!(read_all(head).await.len(), cap as usize);
    assert_eq!(stream.peek_cache().map(Bytes::len), Some(cap as usize));
    assert!(stream.temp_file().is_none());
    assert_eq!(entries(&root), 0);
    stream.close().await.expect("close");

    let mut stream = sequential_stream("edge.bin", data.clone(), &root);
    let head = stream
        .range_read(HttpRange::new(0, cap + 1))
        .await
        .expect("range past the limit");
    assert!(read_all(head).await == data[..=cap as usize]);
    assert!(stream.peek_cache().is_none());
    assert!(stream.temp_file().is_some());
    assert_eq!(entries(&root), 1);
    stream.close().await.expect("close");
    assert_eq!(entries(&root), 0);
    cleanup(root).await;
}

#[tokio::test]
async fn close_reports_every_failure() {
    let root = temp_root();
    let mut stream = sequential_stream("data.bin", pattern(2 * KIB), &root);
    stream
        .cache_full_in_temp_file()
        .await
        .expect("materialize");
    let path = stream.temp_file().expect("temp file").path().to_path_buf();

    tokio::fs::remove_file(&path).await.expect("remove temp file");
    tokio::fs::create_dir(&path).await.expect("replace with directory");
    tokio::fs::write(path.join("keep"), b"x")
        .await
        .expect("populate directory");

    let failing = CountingCloser::failing();
    let healthy = Arc::new(CountingCloser::default());
    stream.add_closer(Arc::clone(&failing));
    stream.add_closer(Arc::clone(&healthy));

    let err = stream.close().await.expect_err("close must fail");
    match err {
        StreamError::Multiple(list) => {
            assert_eq!(list.len(), 2);
            assert!(matches!(list.errors()[0], StreamError::Io(_)));
            assert!(matches!(
                list.errors()[1],
                StreamError::RemoveTempFile { .. }
            ));
        }
        other => panic!("expected aggregated error, got {other:?}"),
    }
    assert_eq!(failing.closed(), 1);
    assert_eq!(healthy.closed(), 1);
    assert!(stream.is_closed());

    stream.close().await.expect("second close is a no-op");
    assert_eq!(failing.closed(), 1);
    cleanup(root).await;
}

#[tokio::test]
async fn closed_stream_rejects_reads() {
    let root = temp_root();
    let mut stream = sequential_stream("gone.bin", pattern(32), &root);
    stream.close().await.expect("close");

    let err = stream
        .range_read(HttpRange::new(0, 4))
        .await
        .err()
        .expect("range read after close");
    assert!(matches!(err, StreamError::Closed));

    let mut buf = [0u8; 8];
    let err = stream.read(&mut buf).await.expect_err("read after close");
    assert!(matches!(err, StreamError::Closed));

    let err = stream
        .cache_full_in_temp_file()
        .await
        .expect_err("materialize after close");
    assert!(matches!(err, StreamError::Closed));
    cleanup(root).await;
}

#[tokio::test]
async fn stream_without_reader_has_no_range_source() {
    let mut stream = BaseStream::builder(Object::new("nothing.bin", 10))
        .build()
        .expect("builder should succeed");
    let err = stream
        .range_read(HttpRange::new(2, 2))
        .await
        .err()
        .expect("no source");
    assert!(matches!(err, StreamError::RangeUnavailable));
}

fn sequential_stream(name: &str, data: Vec<u8>, root: &std::path::Path) -> BaseStream {
    StreamBuilder::new(Object::new(name, data.len() as u64))
        .reader(Cursor::new(data))
        .config(StreamConfig::with_temp_dir(root))
        .build()
        .expect("builder should succeed")
}
