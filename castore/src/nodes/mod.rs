//! This holds types describing nodes in the snapshot model.
mod attributes;
mod symlink_target;
mod tree;

use crate::B3Digest;
use serde::{Deserialize, Serialize};

pub use attributes::{Attributes, ExtendedAttribute, GenericAttributes, Timestamp};
pub use symlink_target::SymlinkTarget;
pub use tree::Tree;

fn default_links() -> u64 {
    1
}

/// A Node is either a directory, a regular file or a symlink.
/// Nodes themselves don't have names, what gives them names is them
/// being inside a [Tree].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Points to the [Tree] describing the directory contents, by its
    /// [Tree::digest].
    Directory { subtree: B3Digest, attrs: Attributes },
    /// A regular file.
    File {
        /// Digests of the content blobs, to be concatenated in order.
        content: Vec<B3Digest>,

        /// The total file content size
        size: u64,

        /// Device and inode the file had when the snapshot was taken.
        /// Together with `links`, this is used to recover hardlinks.
        #[serde(default)]
        device: u64,
        #[serde(default)]
        inode: u64,
        #[serde(default = "default_links")]
        links: u64,

        attrs: Attributes,
    },
    /// A symbolic link.
    Symlink {
        target: SymlinkTarget,
        attrs: Attributes,
    },
}

impl Node {
    pub fn attrs(&self) -> &Attributes {
        match self {
            Node::Directory { attrs, .. } => attrs,
            Node::File { attrs, .. } => attrs,
            Node::Symlink { attrs, .. } => attrs,
        }
    }

    /// Human readable type name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Directory { .. } => "directory",
            Node::File { .. } => "file",
            Node::Symlink { .. } => "symlink",
        }
    }
}
