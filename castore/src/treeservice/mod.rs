use async_trait::async_trait;

use crate::{B3Digest, Error, Tree};

mod from_addr;
mod memory;
mod simplefs;

#[cfg(test)]
mod tests;

pub use self::from_addr::from_addr;
pub use self::memory::MemoryTreeService;
pub use self::simplefs::SimpleFilesystemTreeService;

/// The base trait all Tree services need to implement.
/// This is a simple get and put of [Tree], returning their digest.
#[async_trait]
pub trait TreeService: Send + Sync {
    /// Looks up a single Tree by its digest.
    /// The returned Tree *must* have the requested digest.
    /// In case the tree is not found, Ok(None) is returned.
    async fn get(&self, digest: &B3Digest) -> Result<Option<Tree>, Error>;

    /// Uploads a single Tree, and returns the calculated digest.
    async fn put(&self, tree: Tree) -> Result<B3Digest, Error>;
}

#[async_trait]
impl<A> TreeService for A
where
    A: AsRef<dyn TreeService> + Send + Sync,
{
    async fn get(&self, digest: &B3Digest) -> Result<Option<Tree>, Error> {
        self.as_ref().get(digest).await
    }

    async fn put(&self, tree: Tree) -> Result<B3Digest, Error> {
        self.as_ref().put(tree).await
    }
}
