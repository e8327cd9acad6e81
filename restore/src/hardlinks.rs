use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Remembers the first restored path of each hardlinked file, keyed by the
/// device and inode recorded in the snapshot.
///
/// Only lives for a single restore run.
#[derive(Debug, Default)]
pub struct HardlinkIndex {
    index: HashMap<(u64, u64), PathBuf>,
}

impl HardlinkIndex {
    pub fn get(&self, device: u64, inode: u64) -> Option<&Path> {
        self.index.get(&(device, inode)).map(PathBuf::as_path)
    }

    /// Records `path` as the restored file for the key.
    /// An already recorded path is kept.
    pub fn add(&mut self, device: u64, inode: u64, path: PathBuf) {
        self.index.entry((device, inode)).or_insert(path);
    }
}
