#![allow(missing_docs)]

use seekstream::{HttpRange, Link, Object, SeekableStream, StreamBuilder, StreamError};
use tokio::io::AsyncReadExt;

// usage: range_probe <url> <size> [start] [length]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StreamError> {
    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        println!("usage: range_probe <url> <size> [start] [length]");
        return Ok(());
    };
    let size: u64 = args.next().and_then(|value| value.parse().ok()).unwrap_or(0);
    let start: u64 = args.next().and_then(|value| value.parse().ok()).unwrap_or(0);
    let range = match args.next().and_then(|value| value.parse().ok()) {
        Some(length) => HttpRange::new(start, length),
        None => HttpRange::from_start(start),
    };

    let name = url.rsplit('/').next().unwrap_or("remote").to_owned();
    let base = StreamBuilder::new(Object::new(name, size)).build()?;
    let mut stream = SeekableStream::new(base, Some(Link::from_url(url)))?;
    println!("{} ({}, {} bytes)", stream.name(), stream.mimetype(), stream.size());

    let mut reader = stream.range_read(range).await?;
    let mut body = Vec::new();
    reader.read_to_end(&mut body).await?;
    println!("read {} bytes starting at {start}", body.len());

    stream.close().await
}
