use std::path::PathBuf;

use snaprestore_castore::B3Digest;
use thiserror::Error;

/// Errors that can occur while restoring or verifying a snapshot.
///
/// Most of them concern a single entry and are passed to the error hook,
/// which decides whether the run continues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to load object {0}: {1}")]
    ObjectLoad(B3Digest, String),

    #[error("invalid child node name {0}")]
    InvalidNodeName(String),

    #[error("refusing to replace {existing} at {path} with {incoming}")]
    TypeConflict {
        path: PathBuf,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error("Invalid file size for {path}: expected {expected}, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid file content for {0}: blob {1} differs")]
    ContentMismatch(PathBuf, B3Digest),

    #[error("Invalid file type for {0}: expected a regular file")]
    NotAFile(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("unable to create {0}: {1}")]
    UnableToCreate(PathBuf, std::io::Error),

    #[error("unable to write {0}: {1}")]
    UnableToWrite(PathBuf, std::io::Error),

    #[error("unable to read {0}: {1}")]
    UnableToRead(PathBuf, std::io::Error),

    #[error("unable to remove {0}: {1}")]
    UnableToRemove(PathBuf, std::io::Error),

    #[error("unable to stat {0}: {1}")]
    UnableToStat(PathBuf, std::io::Error),

    #[error("unable to set metadata on {0}: {1}")]
    UnableToSetMetadata(PathBuf, std::io::Error),

    #[error("failure talking to the store: {0}")]
    Store(#[from] snaprestore_castore::Error),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
