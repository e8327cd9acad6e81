#[cfg(test)]
use rstest_reuse;

mod digests;
mod errors;
mod nodes;

pub mod blobservice;
pub mod fixtures;
pub mod treeservice;
pub mod utils;

pub use digests::{B3Digest, Error as DigestError, B3_LEN};
pub use errors::{Error, ValidateTreeError};
pub use nodes::{
    Attributes, ExtendedAttribute, GenericAttributes, Node, SymlinkTarget, Timestamp, Tree,
};
