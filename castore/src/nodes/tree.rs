use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{B3Digest, Error, Node, ValidateTreeError};

/// A Tree describes the contents of one directory, mapping child names to
/// [Node]s.
///
/// Entries are kept sorted by name, which gives every traversal the same,
/// deterministic order.
///
/// Names are *not* validated here: a tree read from a store is untrusted input,
/// and it's up to the consumer to reject names like `..` or ones containing
/// path separators before touching a filesystem.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    nodes: BTreeMap<String, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the specified [Node] under the given name.
    ///
    /// Inserting an element that already exists with the same name will yield
    /// an error.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) -> Result<(), ValidateTreeError> {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(ValidateTreeError::DuplicateName(name));
        }
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Allows iterating over all nodes, ordered by their name.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Node)> + Send + Sync + '_ {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the canonical serialization of the tree.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("snaprestore bug: tree must serialize")
    }

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Calculates the digest of a Tree, which is the blake3 hash of its
    /// canonical serialization.
    pub fn digest(&self) -> B3Digest {
        B3Digest::of(&self.encode())
    }
}
