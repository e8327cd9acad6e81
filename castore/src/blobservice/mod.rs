use async_trait::async_trait;
use std::io;
use tokio::io::AsyncReadExt;

use crate::B3Digest;

mod from_addr;
mod memory;
mod simplefs;

#[cfg(test)]
mod tests;

pub use self::from_addr::from_addr;
pub use self::memory::MemoryBlobService;
pub use self::simplefs::SimpleFilesystemBlobService;

/// The base trait all BlobService services need to implement.
/// It provides functions to check whether a given blob exists,
/// a way to read (and seek) a blob, and a method to create a blobwriter handle,
/// which will implement a writer interface, and also provides a close funtion,
/// to finalize a blob and get its digest.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Check if the service has the blob, by its content hash.
    async fn has(&self, digest: &B3Digest) -> io::Result<bool>;

    /// Request a blob from the store, by its content hash.
    async fn open_read(&self, digest: &B3Digest) -> io::Result<Option<Box<dyn BlobReader>>>;

    /// Insert a new blob into the store. Returns a [BlobWriter], which
    /// implements [tokio::io::AsyncWrite] and a [BlobWriter::close] to finalize
    /// the blob and get its digest.
    async fn open_write(&self) -> Box<dyn BlobWriter>;

    /// Reads a whole blob into memory.
    /// Returns Ok(None) if the blob doesn't exist. The contents are checked
    /// against the digest, a mismatch is reported as [io::ErrorKind::InvalidData].
    async fn read_all(&self, digest: &B3Digest) -> io::Result<Option<Vec<u8>>> {
        let mut reader = match self.open_read(digest).await? {
            Some(reader) => reader,
            None => return Ok(None),
        };

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;

        let actual = B3Digest::of(&buf);
        if actual != *digest {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("blob {} has unexpected digest {}", digest, actual),
            ));
        }

        Ok(Some(buf))
    }
}

#[async_trait]
impl<A> BlobService for A
where
    A: AsRef<dyn BlobService> + Send + Sync,
{
    async fn has(&self, digest: &B3Digest) -> io::Result<bool> {
        self.as_ref().has(digest).await
    }

    async fn open_read(&self, digest: &B3Digest) -> io::Result<Option<Box<dyn BlobReader>>> {
        self.as_ref().open_read(digest).await
    }

    async fn open_write(&self) -> Box<dyn BlobWriter> {
        self.as_ref().open_write().await
    }

    async fn read_all(&self, digest: &B3Digest) -> io::Result<Option<Vec<u8>>> {
        self.as_ref().read_all(digest).await
    }
}

/// A [tokio::io::AsyncWrite] that the user needs to close() afterwards for persist.
/// On success, it returns the digest of the written blob.
#[async_trait]
pub trait BlobWriter: tokio::io::AsyncWrite + Send + Unpin {
    /// Signal there's no more data to be written, and return the digest of the
    /// contents written.
    ///
    /// Closing a already-closed BlobWriter is a no-op.
    async fn close(&mut self) -> io::Result<B3Digest>;
}

/// BlobReader is a [tokio::io::AsyncRead] that also allows seeking.
pub trait BlobReader: tokio::io::AsyncRead + tokio::io::AsyncSeek + Send + Unpin + 'static {}

/// A [`io::Cursor<Vec<u8>>`] can be used as a BlobReader.
impl BlobReader for io::Cursor<&'static [u8]> {}
impl BlobReader for io::Cursor<Vec<u8>> {}
impl BlobReader for io::Cursor<bytes::Bytes> {}
impl BlobReader for tokio::fs::File {}
