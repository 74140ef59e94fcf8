use std::{
    io::{ErrorKind, SeekFrom},
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File},
    io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use uuid::Uuid;

use crate::{Closer, RandomAccessFile, RangeReader, ResolvedRange, StreamError, file::check_bounds};

/// Random-access file stored on the local filesystem.
///
/// Every section opens its own handle, so concurrent sections never share a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    path: PathBuf,
    size: u64,
}

impl LocalFile {
    /// Opens an existing file and records its current size.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StreamError> {
        let path = path.into();
        let metadata = fs::metadata(&path).await?;
        Ok(Self {
            path,
            size: metadata.len(),
        })
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Closer for LocalFile {}

#[async_trait::async_trait]
impl RandomAccessFile for LocalFile {
    fn size(&self) -> u64 {
        self.size
    }

    async fn section(&self, range: ResolvedRange) -> Result<RangeReader, StreamError> {
        check_bounds(range, self.size)?;
        let mut file = File::open(&self.path).await?;
        if range.start > 0 {
            file.seek(SeekFrom::Start(range.start)).await?;
        }
        Ok(Box::new(file.take(range.length)))
    }
}

/// Full local copy of a stream, deleted when the owning stream closes.
#[derive(Debug, PartialEq, Eq)]
pub struct TempFile {
    file: LocalFile,
}

impl TempFile {
    /// Copies `reader` to a new file under `dir`.
    ///
    /// A non-zero `size` is the declared length of the content; any other byte
    /// count removes the partial file and fails with [`StreamError::ShortRead`].
    pub async fn create<R>(dir: &Path, mut reader: R, size: u64) -> Result<Self, StreamError>
    where
        R: AsyncRead + Unpin,
    {
        fs::create_dir_all(dir).await?;
        let path = dir.join(format!("file-{}", Uuid::new_v4()));

        let written = match write_all(&path, &mut reader).await {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&path).await;
                return Err(err);
            }
        };
        if size != 0 && written != size {
            let _ = fs::remove_file(&path).await;
            return Err(StreamError::ShortRead {
                expected: size,
                actual: written,
            });
        }

        Ok(Self {
            file: LocalFile {
                path,
                size: written,
            },
        })
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the file. A file that is already gone is not an error.
    pub async fn remove(&self) -> Result<(), StreamError> {
        match fs::remove_file(self.path()).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StreamError::RemoveTempFile {
                path: self.path().to_path_buf(),
                source,
            }),
        }
    }
}

impl Closer for TempFile {}

#[async_trait::async_trait]
impl RandomAccessFile for TempFile {
    fn size(&self) -> u64 {
        self.file.size
    }

    async fn section(&self, range: ResolvedRange) -> Result<RangeReader, StreamError> {
        self.file.section(range).await
    }
}

async fn write_all<R>(path: &Path, reader: &mut R) -> Result<u64, StreamError>
where
    R: AsyncRead + Unpin,
{
    let mut file = File::create(path).await?;
    let written = tokio::io::copy(reader, &mut file)
        .await
        .map_err(StreamError::from_io)?;
    file.flush().await?;
    Ok(written)
}
