use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use data_encoding::HEXLOWER;
use tracing::{instrument, warn};

use super::TreeService;
use crate::{B3Digest, Error, Tree};

/// A TreeService keeping each [Tree] in its own file, below
/// `trees/B3DIGEST[:2]/B3DIGEST`.
///
/// Files are staged in `tmp` and renamed into place, so a reader never sees a
/// partially written tree.
#[derive(Clone)]
pub struct SimpleFilesystemTreeService {
    path: PathBuf,
}

impl SimpleFilesystemTreeService {
    pub async fn new(path: PathBuf) -> io::Result<Self> {
        tokio::fs::create_dir_all(path.join("tmp")).await?;
        tokio::fs::create_dir_all(path.join("trees")).await?;

        Ok(Self { path })
    }
}

fn derive_path(root: &Path, digest: &B3Digest) -> PathBuf {
    let prefix = HEXLOWER.encode(&digest.as_slice()[..1]);
    let pathname = HEXLOWER.encode(digest.as_slice());

    root.join("trees").join(prefix).join(pathname)
}

#[async_trait]
impl TreeService for SimpleFilesystemTreeService {
    #[instrument(skip_all, err, fields(tree.digest = %digest))]
    async fn get(&self, digest: &B3Digest) -> Result<Option<Tree>, Error> {
        let data = match tokio::fs::read(derive_path(&self.path, digest)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let actual_digest = B3Digest::of(&data);
        if actual_digest != *digest {
            warn!(actual_digest = %actual_digest, "tree file has unexpected digest");
            return Err(Error::StorageError(format!(
                "requested tree with digest {}, but got {}",
                digest, actual_digest
            )));
        }

        Ok(Some(Tree::decode(&data)?))
    }

    #[instrument(skip_all, err)]
    async fn put(&self, tree: Tree) -> Result<B3Digest, Error> {
        let data = tree.encode();
        let digest = B3Digest::of(&data);
        let dst_path = derive_path(&self.path, &digest);

        if tokio::fs::try_exists(&dst_path).await? {
            return Ok(digest);
        }

        let tmp_path = self.path.join("tmp").join(digest.to_string());
        tokio::fs::write(&tmp_path, &data).await?;
        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&tmp_path, &dst_path).await?;

        Ok(digest)
    }
}
