use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use super::TreeService;
use crate::{B3Digest, Error, Tree};

#[derive(Clone, Default)]
pub struct MemoryTreeService {
    db: Arc<RwLock<HashMap<B3Digest, Tree>>>,
}

#[async_trait]
impl TreeService for MemoryTreeService {
    #[instrument(skip(self, digest), fields(tree.digest = %digest))]
    async fn get(&self, digest: &B3Digest) -> Result<Option<Tree>, Error> {
        let db = self.db.read();

        match db.get(digest) {
            None => Ok(None),
            Some(tree) => {
                // Validate the retrieved Tree indeed has the
                // digest we expect it to have, to detect corruptions.
                let actual_digest = tree.digest();
                if actual_digest != *digest {
                    return Err(Error::StorageError(format!(
                        "requested tree with digest {}, but got {}",
                        digest, actual_digest
                    )));
                }

                Ok(Some(tree.clone()))
            }
        }
    }

    #[instrument(skip_all, fields(tree.digest))]
    async fn put(&self, tree: Tree) -> Result<B3Digest, Error> {
        let digest = tree.digest();
        tracing::Span::current().record("tree.digest", tracing::field::display(&digest));

        self.db.write().insert(digest.clone(), tree);

        Ok(digest)
    }
}
