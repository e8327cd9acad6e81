use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::Permissions;
use std::io::SeekFrom;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nix::fcntl::OFlag;
use snaprestore_castore::{blobservice::BlobService, B3Digest, Node, SymlinkTarget};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::hardlinks::HardlinkIndex;
use crate::metadata::apply_metadata;
use crate::overwrite::{should_write, EntryKind, ExistingEntry, OverwriteDecision};
use crate::walk::TreeVisitor;
use crate::{Error, Options, RestoreStats};

/// Runs of zeros of this size are written as holes in sparse mode.
const SPARSE_BLOCK_SIZE: usize = 4096;

/// Loads a whole blob, giving up as soon as `cancel` fires.
pub(crate) async fn load_blob<BS>(
    blob_service: &BS,
    cancel: &CancellationToken,
    digest: &B3Digest,
) -> Result<Vec<u8>, Error>
where
    BS: BlobService,
{
    let data = tokio::select! {
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        data = blob_service.read_all(digest) => data,
    };

    match data {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(Error::ObjectLoad(digest.clone(), "blob not found".to_string())),
        Err(e) => Err(Error::ObjectLoad(digest.clone(), e.to_string())),
    }
}

async fn create_dir(path: &Path) -> Result<(), Error> {
    tokio::fs::DirBuilder::new()
        .mode(0o700)
        .create(path)
        .await
        .map_err(|e| Error::UnableToCreate(path.to_path_buf(), e))
}

async fn remove_existing(path: &Path, existing: &ExistingEntry) -> Result<(), Error> {
    let res = match existing.kind {
        EntryKind::Directory => tokio::fs::remove_dir_all(path).await,
        _ => tokio::fs::remove_file(path).await,
    };
    res.map_err(|e| Error::UnableToRemove(path.to_path_buf(), e))
}

fn type_conflict(path: &Path, existing: Option<&ExistingEntry>, incoming: &Node) -> Error {
    Error::TypeConflict {
        path: path.to_path_buf(),
        existing: existing.map(|e| e.kind.as_str()).unwrap_or("entry"),
        incoming: incoming.kind(),
    }
}

/// Writes `data` at the current position, seeking over blocks consisting of
/// zeros only. The file must already have its final size.
async fn write_sparse(file: &mut tokio::fs::File, data: &[u8]) -> std::io::Result<()> {
    for block in data.chunks(SPARSE_BLOCK_SIZE) {
        if block.iter().all(|b| *b == 0) {
            file.seek(SeekFrom::Current(block.len() as i64)).await?;
        } else {
            file.write_all(block).await?;
        }
    }
    Ok(())
}

/// The [TreeVisitor] creating files, directories and symlinks below the
/// target directory.
pub(crate) struct Materializer<'a, BS> {
    blob_service: &'a BS,
    options: &'a Options,
    cancel: &'a CancellationToken,

    /// Locations of the files restored in this run.
    restored: &'a mut HashSet<String>,
    stats: &'a mut RestoreStats,

    hardlinks: HardlinkIndex,
    /// Existing directories whose metadata must not be touched.
    preserved_dirs: HashSet<PathBuf>,
    chown: bool,
}

impl<'a, BS> Materializer<'a, BS>
where
    BS: BlobService,
{
    pub fn new(
        blob_service: &'a BS,
        options: &'a Options,
        cancel: &'a CancellationToken,
        restored: &'a mut HashSet<String>,
        stats: &'a mut RestoreStats,
    ) -> Self {
        Self {
            blob_service,
            options,
            cancel,
            restored,
            stats,
            hardlinks: HardlinkIndex::default(),
            preserved_dirs: HashSet::new(),
            chown: nix::unistd::geteuid().is_root(),
        }
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Makes sure a directory we can write into exists at `target`.
    async fn prepare_dir(&mut self, node: &Node, target: &Path) -> Result<(), Error> {
        let existing = ExistingEntry::lstat(target).await?;

        match (should_write(existing.as_ref(), node, self.options.overwrite), &existing) {
            (OverwriteDecision::Conflict, _) => Err(type_conflict(target, existing.as_ref(), node)),
            (OverwriteDecision::Skip, _) => {
                self.preserved_dirs.insert(target.to_path_buf());
                Ok(())
            }
            (OverwriteDecision::Replace, Some(existing)) => {
                remove_existing(target, existing).await?;
                create_dir(target).await
            }
            (OverwriteDecision::UpdateMetadata | OverwriteDecision::Overwrite, Some(existing)) => {
                // the final mode is applied when leaving the directory.
                if existing.mode & 0o700 != 0o700 {
                    tokio::fs::set_permissions(
                        target,
                        Permissions::from_mode((existing.mode & 0o7777) | 0o700),
                    )
                    .await
                    .map_err(|e| Error::UnableToSetMetadata(target.to_path_buf(), e))?;
                }
                Ok(())
            }
            _ => create_dir(target).await,
        }
    }

    /// Applies the metadata of a directory, unless it's an existing one to be
    /// kept as is.
    async fn finish_dir(&mut self, node: &Node, target: &Path) -> Result<(), Error> {
        if self.preserved_dirs.remove(target) {
            debug!(target = %target.display(), "keeping existing directory");
            self.stats.skipped += 1;
            return Ok(());
        }

        apply_metadata(target, node.attrs(), false, self.chown).await?;
        self.stats.directories += 1;
        Ok(())
    }

    /// Creates or truncates the file at `target` and writes the blobs to it.
    /// Returns the number of bytes written.
    async fn write_content(
        &self,
        target: &Path,
        content: &[B3Digest],
        size: u64,
    ) -> Result<u64, Error> {
        let write_err = |e| Error::UnableToWrite(target.to_path_buf(), e);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .custom_flags(OFlag::O_NOFOLLOW.bits())
            .open(target)
            .await
            .map_err(|e| Error::UnableToCreate(target.to_path_buf(), e))?;

        // holes are whatever isn't written after extending the empty file.
        if self.options.sparse {
            file.set_len(size).await.map_err(write_err)?;
        }

        let mut written = 0;
        for digest in content {
            self.check_cancelled()?;
            let data = load_blob(self.blob_service, self.cancel, digest).await?;

            if self.options.sparse {
                write_sparse(&mut file, &data).await.map_err(write_err)?;
            } else {
                file.write_all(&data).await.map_err(write_err)?;
            }
            written += data.len() as u64;
        }

        file.flush().await.map_err(write_err)?;

        Ok(written)
    }

    #[allow(clippy::too_many_arguments)]
    async fn restore_file(
        &mut self,
        node: &Node,
        content: &[B3Digest],
        size: u64,
        device: u64,
        inode: u64,
        links: u64,
        target: &Path,
        location: &str,
    ) -> Result<(), Error> {
        let existing = ExistingEntry::lstat(target).await?;

        if links > 1 {
            if let Some(first) = self.hardlinks.get(device, inode).map(Path::to_path_buf) {
                return self
                    .restore_hardlink(&first, node, target, location, existing.as_ref())
                    .await;
            }
        }

        let write_content = match should_write(existing.as_ref(), node, self.options.overwrite) {
            OverwriteDecision::Skip => {
                debug!(location, "keeping existing file");
                self.stats.skipped += 1;
                return Ok(());
            }
            OverwriteDecision::Conflict => {
                return Err(type_conflict(target, existing.as_ref(), node))
            }
            OverwriteDecision::UpdateMetadata => false,
            OverwriteDecision::Replace => {
                if let Some(existing) = &existing {
                    remove_existing(target, existing).await?;
                }
                true
            }
            OverwriteDecision::Create | OverwriteDecision::Overwrite => true,
        };

        if write_content {
            self.stats.bytes_written += self.write_content(target, content, size).await?;
        }
        apply_metadata(target, node.attrs(), false, self.chown).await?;

        if links > 1 {
            self.hardlinks.add(device, inode, target.to_path_buf());
        }
        self.restored.insert(location.to_string());
        self.stats.files += 1;

        Ok(())
    }

    /// Links `target` to `first`, the already restored file of the same
    /// hardlink group.
    ///
    /// An unrelated entry at `target` is subject to the overwrite policy like
    /// any other file.
    async fn restore_hardlink(
        &mut self,
        first: &Path,
        node: &Node,
        target: &Path,
        location: &str,
        existing: Option<&ExistingEntry>,
    ) -> Result<(), Error> {
        if let Some(existing) = existing {
            let first_entry = ExistingEntry::lstat(first).await?;
            if first_entry.is_some_and(|f| f.is_same_file(existing)) {
                debug!(location, "already linked");
                self.restored.insert(location.to_string());
                self.stats.hardlinks += 1;
                return Ok(());
            }

            match should_write(Some(existing), node, self.options.overwrite) {
                OverwriteDecision::Skip => {
                    debug!(location, "keeping existing file");
                    self.stats.skipped += 1;
                    return Ok(());
                }
                OverwriteDecision::Conflict => {
                    return Err(type_conflict(target, Some(existing), node))
                }
                _ => remove_existing(target, existing).await?,
            }
        }

        tokio::fs::hard_link(first, target)
            .await
            .map_err(|e| Error::UnableToCreate(target.to_path_buf(), e))?;

        self.restored.insert(location.to_string());
        self.stats.hardlinks += 1;

        Ok(())
    }

    async fn restore_symlink(
        &mut self,
        node: &Node,
        link_target: &SymlinkTarget,
        target: &Path,
        location: &str,
    ) -> Result<(), Error> {
        let existing = ExistingEntry::lstat(target).await?;

        match (should_write(existing.as_ref(), node, self.options.overwrite), &existing) {
            (OverwriteDecision::Skip, _) => {
                debug!(location, "keeping existing symlink");
                self.stats.skipped += 1;
                return Ok(());
            }
            (OverwriteDecision::Conflict, _) => {
                return Err(type_conflict(target, existing.as_ref(), node))
            }
            (OverwriteDecision::Create, _) | (_, None) => {}
            (_, Some(existing)) => remove_existing(target, existing).await?,
        }

        tokio::fs::symlink(OsStr::from_bytes(link_target.as_ref()), target)
            .await
            .map_err(|e| Error::UnableToCreate(target.to_path_buf(), e))?;
        apply_metadata(target, node.attrs(), true, self.chown).await?;
        self.stats.symlinks += 1;

        Ok(())
    }
}

#[async_trait]
impl<'a, BS> TreeVisitor for Materializer<'a, BS>
where
    BS: BlobService,
{
    async fn enter_dir(&mut self, node: &Node, target: &Path, _location: &str) -> Result<(), Error> {
        self.check_cancelled()?;
        self.prepare_dir(node, target).await
    }

    async fn visit_node(
        &mut self,
        node: &Node,
        target: &Path,
        location: &str,
    ) -> Result<(), Error> {
        self.check_cancelled()?;

        match node {
            Node::Directory { .. } => {
                // selected, but its children are not.
                self.prepare_dir(node, target).await?;
                self.finish_dir(node, target).await?;
            }
            Node::File {
                content,
                size,
                device,
                inode,
                links,
                ..
            } => {
                self.restore_file(
                    node, content, *size, *device, *inode, *links, target, location,
                )
                .await?;
            }
            Node::Symlink {
                target: link_target,
                ..
            } => {
                self.restore_symlink(node, link_target, target, location)
                    .await?;
            }
        }

        Span::current().pb_inc(1);
        Ok(())
    }

    async fn leave_dir(
        &mut self,
        node: &Node,
        target: &Path,
        _location: &str,
        restored: bool,
    ) -> Result<(), Error> {
        if !restored {
            self.preserved_dirs.remove(target);
            return Ok(());
        }

        self.check_cancelled()?;
        self.finish_dir(node, target).await
    }
}
