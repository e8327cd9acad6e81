use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use snaprestore_castore::{Node, Timestamp};

use crate::{Error, OverwriteBehavior};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    /// Sockets, fifos, devices.
    Other,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Directory => "directory",
            EntryKind::File => "file",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "special file",
        }
    }

    fn of(node: &Node) -> Self {
        match node {
            Node::Directory { .. } => EntryKind::Directory,
            Node::File { .. } => EntryKind::File,
            Node::Symlink { .. } => EntryKind::Symlink,
        }
    }
}

/// What is found at a target path before restoring to it, from `lstat`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistingEntry {
    pub kind: EntryKind,
    pub mode: u32,
    pub size: u64,
    pub mtime: Timestamp,
    pub nlink: u64,
    pub dev: u64,
    pub ino: u64,
}

impl ExistingEntry {
    /// Looks at `path` without following symlinks.
    /// Returns Ok(None) if there's nothing.
    pub async fn lstat(path: &Path) -> Result<Option<Self>, Error> {
        match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => Ok(Some(metadata.into())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::UnableToStat(path.to_path_buf(), e)),
        }
    }

    pub fn is_same_file(&self, other: &ExistingEntry) -> bool {
        self.dev == other.dev && self.ino == other.ino
    }
}

impl From<std::fs::Metadata> for ExistingEntry {
    fn from(metadata: std::fs::Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        };

        Self {
            kind,
            mode: metadata.mode(),
            size: metadata.size(),
            mtime: Timestamp::new(metadata.mtime(), metadata.mtime_nsec() as u32),
            nlink: metadata.nlink(),
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }
}

/// How to deal with a node about to be restored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwriteDecision {
    /// Nothing exists yet.
    Create,
    /// Write over the existing entry in place.
    Overwrite,
    /// Remove the existing entry, then create.
    Replace,
    /// Keep the existing entry and its content, only apply metadata.
    UpdateMetadata,
    /// Leave the existing entry alone.
    Skip,
    /// The existing entry has a different type and may not be removed.
    Conflict,
}

/// Decides what happens to `existing` when restoring `incoming` under the
/// given behavior.
///
/// Under [OverwriteBehavior::IfChanged], a file with matching size and
/// modification time is assumed to have the right content.
pub fn should_write(
    existing: Option<&ExistingEntry>,
    incoming: &Node,
    behavior: OverwriteBehavior,
) -> OverwriteDecision {
    let existing = match existing {
        None => return OverwriteDecision::Create,
        Some(existing) => existing,
    };

    if existing.kind != EntryKind::of(incoming) {
        return match behavior {
            OverwriteBehavior::Never => OverwriteDecision::Conflict,
            _ => OverwriteDecision::Replace,
        };
    }

    let incoming_mtime = incoming.attrs().mtime;

    match incoming {
        Node::Directory { .. } => match behavior {
            OverwriteBehavior::Never => OverwriteDecision::Skip,
            _ => OverwriteDecision::UpdateMetadata,
        },
        Node::Symlink { .. } => match behavior {
            OverwriteBehavior::Never => OverwriteDecision::Skip,
            OverwriteBehavior::IfNewer if incoming_mtime <= existing.mtime => {
                OverwriteDecision::Skip
            }
            _ => OverwriteDecision::Replace,
        },
        Node::File { size, .. } => {
            let write = match behavior {
                OverwriteBehavior::Always => true,
                OverwriteBehavior::IfChanged => {
                    if existing.size == *size && existing.mtime == incoming_mtime {
                        return OverwriteDecision::UpdateMetadata;
                    }
                    true
                }
                OverwriteBehavior::IfNewer => incoming_mtime > existing.mtime,
                OverwriteBehavior::Never => false,
            };

            match (write, existing.nlink > 1) {
                (false, _) => OverwriteDecision::Skip,
                // other links keep their content.
                (true, true) => OverwriteDecision::Replace,
                (true, false) => OverwriteDecision::Overwrite,
            }
        }
    }
}
