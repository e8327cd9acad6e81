use url::Url;

use crate::Error;

use super::{MemoryTreeService, SimpleFilesystemTreeService, TreeService};

/// Constructs a new instance of a [TreeService] from an URI.
///
/// The following URIs are supported:
/// - `memory:`
///   Uses a in-memory implementation.
/// - `simplefs:///absolute/path`
///   Stores one file per tree below the given directory.
pub async fn from_addr(uri: &str) -> Result<Box<dyn TreeService>, Error> {
    let url =
        Url::parse(uri).map_err(|e| Error::StorageError(format!("unable to parse url: {}", e)))?;

    let tree_service: Box<dyn TreeService> = match url.scheme() {
        "memory" => {
            // memory doesn't support host or path in the URL.
            if url.has_host() || !url.path().is_empty() {
                return Err(Error::StorageError("invalid url".to_string()));
            }
            Box::<MemoryTreeService>::default()
        }
        "simplefs" => {
            if url.has_host() {
                return Err(Error::StorageError("no host allowed".to_string()));
            }
            if url.path().is_empty() || url.path() == "/" {
                return Err(Error::StorageError(
                    "cowardly refusing to use / as tree directory".to_string(),
                ));
            }
            Box::new(SimpleFilesystemTreeService::new(url.path().into()).await?)
        }
        scheme => {
            return Err(Error::StorageError(format!(
                "unknown scheme: {}",
                scheme
            )))
        }
    };

    Ok(tree_service)
}
