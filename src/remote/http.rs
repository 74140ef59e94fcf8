use std::io;

use futures::TryStreamExt;
use http::{
    HeaderMap, StatusCode,
    header::{CONTENT_RANGE, RANGE},
};
use tokio::io::AsyncReadExt;
use tokio_util::{io::StreamReader, sync::CancellationToken};

use crate::{
    Closer, HttpConfig, Link, RangeReadCloser, RangeReader, ResolvedRange, StreamError,
    io::{CancellableReader, ExactReader, with_cancel},
};

/// Range reader that issues HTTP `Range` requests against a link URL.
#[derive(Debug, Clone)]
pub struct HttpRangeReader {
    client: reqwest::Client,
    url: String,
    header: HeaderMap,
    size: u64,
}

impl HttpRangeReader {
    /// Creates a reader for `url` with default HTTP settings.
    pub fn new(url: impl Into<String>, header: HeaderMap, size: u64) -> Result<Self, StreamError> {
        Self::with_config(url, header, size, &HttpConfig::default())
    }

    /// Creates a reader for `url` with explicit HTTP settings.
    pub fn with_config(
        url: impl Into<String>,
        header: HeaderMap,
        size: u64,
        config: &HttpConfig,
    ) -> Result<Self, StreamError> {
        let url = url.into();
        if url.is_empty() {
            return Err(StreamError::IllegalStream);
        }
        Ok(Self {
            client: config.client()?,
            url,
            header,
            size,
        })
    }

    /// Creates a reader from the URL and headers of `link`.
    pub fn from_link(size: u64, link: &Link, config: &HttpConfig) -> Result<Self, StreamError> {
        let url = link.url.as_deref().ok_or(StreamError::IllegalStream)?;
        Self::with_config(url, link.header.clone(), size, config)
    }

    /// Requested URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, range: ResolvedRange) -> Result<RangeReader, StreamError> {
        if range.length == 0 {
            return Ok(Box::new(tokio::io::empty()));
        }

        let full = range.start == 0 && range.length == self.size;
        let mut request = self.client.get(&self.url).headers(self.header.clone());
        if !full {
            if let Some(value) = range.header_value() {
                request = request.header(RANGE, value);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let ranged = status == StatusCode::PARTIAL_CONTENT
            || response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(content_range_start)
                == Some(range.start);

        let mut body = StreamReader::new(Box::pin(
            response.bytes_stream().map_err(io::Error::other),
        ));
        if full || ranged || range.start == 0 {
            return Ok(Box::new(ExactReader::new(body, range.length)));
        }

        warn!(url = %self.url, "remote server ignored range request, expect low performance");
        let skipped = tokio::io::copy(&mut (&mut body).take(range.start), &mut tokio::io::sink())
            .await
            .map_err(StreamError::from_io)?;
        if skipped != range.start {
            return Err(StreamError::ShortRead {
                expected: range.start,
                actual: skipped,
            });
        }
        Ok(Box::new(ExactReader::new(body, range.length)))
    }
}

impl Closer for HttpRangeReader {}

#[async_trait::async_trait]
impl RangeReadCloser for HttpRangeReader {
    async fn range_read(
        &self,
        cancel: &CancellationToken,
        range: ResolvedRange,
    ) -> Result<RangeReader, StreamError> {
        debug!(url = %self.url, start = range.start, length = range.length, "remote range read");
        let body = with_cancel(cancel, self.fetch(range)).await?;
        Ok(CancellableReader::boxed(body, cancel.clone()))
    }
}

/// Extracts the first byte position of a `Content-Range: bytes a-b/c` value.
fn content_range_start(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (first, _) = rest.split_once('-')?;
    first.trim().parse().ok()
}
