//! Stream types and the common file-streamer capability.

use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::{HttpRange, Obj, RandomAccessFile, RangeReader, StreamError};

/// Sequential stream with peek cache and temp-file materialization.
pub mod base;
/// Stream with random access through a file or a remote range reader.
pub mod seekable;
pub(crate) mod source;

pub use base::BaseStream;
pub use seekable::SeekableStream;

/// Capability shared by every stream handed to storage drivers:
/// sequential reads, metadata, and range reads.
#[async_trait::async_trait]
pub trait FileStreamer: AsyncRead + Send + Unpin {
    /// Object metadata.
    fn obj(&self) -> &Arc<dyn Obj>;

    /// MIME type of the content.
    fn mimetype(&self) -> &str;

    /// Whether the stream must be handed to an asynchronous storage task.
    fn need_store(&self) -> bool;

    /// Object already present at the destination, if known.
    fn exist(&self) -> Option<&Arc<dyn Obj>>;

    /// Records the object already present at the destination.
    fn set_exist(&mut self, obj: Option<Arc<dyn Obj>>);

    /// Returns a reader over `range`. Not for concurrent use on one stream.
    async fn range_read(&mut self, range: HttpRange) -> Result<RangeReader, StreamError>;

    /// Ensures the whole content is available as a random-access file.
    async fn cache_full_in_temp_file(&mut self)
        -> Result<Arc<dyn RandomAccessFile>, StreamError>;

    /// Releases every resource held by the stream.
    async fn close(&mut self) -> Result<(), StreamError>;

    /// Object name.
    fn name(&self) -> &str {
        self.obj().name()
    }

    /// Declared size in bytes.
    fn size(&self) -> u64 {
        self.obj().size()
    }
}

macro_rules! impl_file_streamer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl FileStreamer for $ty {
            fn obj(&self) -> &Arc<dyn Obj> {
                <$ty>::obj(self)
            }

            fn mimetype(&self) -> &str {
                <$ty>::mimetype(self)
            }

            fn need_store(&self) -> bool {
                <$ty>::need_store(self)
            }

            fn exist(&self) -> Option<&Arc<dyn Obj>> {
                <$ty>::exist(self)
            }

            fn set_exist(&mut self, obj: Option<Arc<dyn Obj>>) {
                <$ty>::set_exist(self, obj)
            }

            async fn range_read(&mut self, range: HttpRange) -> Result<RangeReader, StreamError> {
                <$ty>::range_read(self, range).await
            }

            async fn cache_full_in_temp_file(
                &mut self,
            ) -> Result<Arc<dyn RandomAccessFile>, StreamError> {
                <$ty>::cache_full_in_temp_file(self).await
            }

            async fn close(&mut self) -> Result<(), StreamError> {
                <$ty>::close(self).await
            }
        }
    };
}

impl_file_streamer!(BaseStream);
impl_file_streamer!(SeekableStream);
