use std::fmt;

/// Counters collected during one restore run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub files: u64,
    pub directories: u64,
    pub symlinks: u64,
    /// Files restored as a link to an earlier file.
    pub hardlinks: u64,
    /// Entries left untouched because of the overwrite behavior.
    pub skipped: u64,
    pub bytes_written: u64,
}

impl fmt::Display for RestoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files ({} bytes), {} hardlinks, {} directories, {} symlinks, {} skipped",
            self.files,
            self.bytes_written,
            self.hardlinks,
            self.directories,
            self.symlinks,
            self.skipped
        )
    }
}
