use std::{
    io,
    path::{Path, PathBuf},
    pin::{pin, Pin},
    task::{Context, Poll},
};

use async_trait::async_trait;
use data_encoding::HEXLOWER;
use pin_project_lite::pin_project;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use crate::B3Digest;

use super::{BlobReader, BlobService, BlobWriter};

/// A BlobService on an existing path backed by a POSIX-compliant filesystem.
///
/// It takes an existing path, builds a `tmp` directory and a `blobs` directory inside of it. All
/// blobs received are staged in that `tmp` directory, then they are moved **atomically** into
/// `blobs/B3DIGEST[:2]/B3DIGEST[2:]` in a sharding style, e.g. `abcdef` gets turned into `ab/cdef`
#[derive(Clone)]
pub struct SimpleFilesystemBlobService {
    /// Where the blobs are located on a filesystem already mounted.
    path: PathBuf,
}

impl SimpleFilesystemBlobService {
    pub async fn new(path: PathBuf) -> io::Result<Self> {
        tokio::fs::create_dir_all(path.join("tmp")).await?;
        tokio::fs::create_dir_all(path.join("blobs")).await?;

        Ok(Self { path })
    }
}

fn derive_path(root: &Path, digest: &B3Digest) -> PathBuf {
    let prefix = HEXLOWER.encode(&digest.as_slice()[..1]);
    let pathname = HEXLOWER.encode(digest.as_slice());

    root.join("blobs").join(prefix).join(pathname)
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "this file is already closed")
}

#[async_trait]
impl BlobService for SimpleFilesystemBlobService {
    #[instrument(skip_all, ret, err, fields(blob.digest=%digest))]
    async fn has(&self, digest: &B3Digest) -> io::Result<bool> {
        tokio::fs::try_exists(derive_path(&self.path, digest)).await
    }

    #[instrument(skip_all, err, fields(blob.digest=%digest))]
    async fn open_read(&self, digest: &B3Digest) -> io::Result<Option<Box<dyn BlobReader>>> {
        match tokio::fs::File::open(derive_path(&self.path, digest)).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all)]
    async fn open_write(&self) -> Box<dyn BlobWriter> {
        let file = async_tempfile::TempFile::new_in(self.path.join("tmp"))
            .await
            .map_err(|e| match e {
                async_tempfile::Error::Io(io_error) => io_error,
                async_tempfile::Error::InvalidFile => io::Error::new(
                    io::ErrorKind::NotFound,
                    "invalid or missing file specified",
                ),
                async_tempfile::Error::InvalidDirectory => io::Error::new(
                    io::ErrorKind::NotFound,
                    "invalid or missing directory specified",
                ),
            });

        Box::new(SimpleFilesystemBlobWriter {
            root: self.path.clone(),
            file: Some(file),
            digester: blake3::Hasher::new(),
            digest: None,
        })
    }
}

pin_project! {
    struct SimpleFilesystemBlobWriter {
        root: PathBuf,
        // None once closed.
        file: Option<io::Result<async_tempfile::TempFile>>,
        digester: blake3::Hasher,
        digest: Option<B3Digest>,
    }
}

impl SimpleFilesystemBlobWriter {
    fn file_mut(&mut self) -> io::Result<&mut async_tempfile::TempFile> {
        match self.file.as_mut() {
            Some(Ok(file)) => Ok(file),
            Some(Err(e)) => Err(std::mem::replace(e, closed_error())),
            None => Err(closed_error()),
        }
    }
}

impl tokio::io::AsyncWrite for SimpleFilesystemBlobWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        let writer = match self.file_mut() {
            Ok(writer) => writer,
            Err(e) => return Poll::Ready(Err(e)),
        };

        match pin!(writer).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                let this = self.project();
                this.digester.update(&buf[..n]);
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        match self.file_mut() {
            Ok(writer) => pin!(writer).poll_flush(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), io::Error>> {
        match self.file_mut() {
            Ok(writer) => pin!(writer).poll_shutdown(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

#[async_trait]
impl BlobWriter for SimpleFilesystemBlobWriter {
    async fn close(&mut self) -> io::Result<B3Digest> {
        if self.file.is_none() {
            return self.digest.clone().ok_or_else(closed_error);
        }

        let writer = self.file_mut()?;
        writer.flush().await?;
        writer.sync_all().await?;
        let tmp_path = writer.file_path().to_owned();

        let digest: B3Digest = self.digester.finalize().into();
        let dst_path = derive_path(&self.root, &digest);
        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(tmp_path, dst_path).await?;

        self.file = None;
        self.digest = Some(digest.clone());

        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::{derive_path, SimpleFilesystemBlobService};
    use crate::blobservice::BlobService;
    use crate::fixtures::{HELLOWORLD_BLOB_CONTENTS, HELLOWORLD_BLOB_DIGEST};
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    /// Blobs end up sharded by the first byte of their digest.
    #[tokio::test]
    async fn layout() {
        let tmpdir = TempDir::new().unwrap();
        let blob_service = SimpleFilesystemBlobService::new(tmpdir.path().to_path_buf())
            .await
            .unwrap();

        let mut w = blob_service.open_write().await;
        w.write_all(HELLOWORLD_BLOB_CONTENTS).await.unwrap();
        w.close().await.unwrap();

        let hex = HELLOWORLD_BLOB_DIGEST.to_string();
        assert_eq!(
            tmpdir.path().join("blobs").join(&hex[..2]).join(&hex),
            derive_path(tmpdir.path(), &HELLOWORLD_BLOB_DIGEST)
        );
        assert_eq!(
            HELLOWORLD_BLOB_CONTENTS,
            std::fs::read(derive_path(tmpdir.path(), &HELLOWORLD_BLOB_DIGEST)).unwrap()
        );
        assert_eq!(0, std::fs::read_dir(tmpdir.path().join("tmp")).unwrap().count());
    }

    /// Blobs changed on disk are refused by read_all.
    #[tokio::test]
    async fn corrupt_blob() {
        let tmpdir = TempDir::new().unwrap();
        let blob_service = SimpleFilesystemBlobService::new(tmpdir.path().to_path_buf())
            .await
            .unwrap();

        let mut w = blob_service.open_write().await;
        w.write_all(HELLOWORLD_BLOB_CONTENTS).await.unwrap();
        w.close().await.unwrap();

        std::fs::write(
            derive_path(tmpdir.path(), &HELLOWORLD_BLOB_DIGEST),
            b"Hello Worlt!",
        )
        .unwrap();

        let err = blob_service
            .read_all(&HELLOWORLD_BLOB_DIGEST)
            .await
            .expect_err("must fail");
        assert_eq!(std::io::ErrorKind::InvalidData, err.kind());
    }
}
