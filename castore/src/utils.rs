//! Constructors to provide instances of a BlobService and TreeService.
//! Only used for testing purposes, but across crates.

use std::sync::Arc;

use crate::{
    blobservice::{BlobService, MemoryBlobService},
    treeservice::{MemoryTreeService, TreeService},
};

pub fn gen_blob_service() -> Arc<dyn BlobService> {
    Arc::new(MemoryBlobService::default())
}

pub fn gen_tree_service() -> Arc<dyn TreeService> {
    Arc::new(MemoryTreeService::default())
}
