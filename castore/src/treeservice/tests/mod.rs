//! This contains test scenarios that a given [TreeService] needs to pass.

use rstest::*;
use rstest_reuse::{self, *};

use super::{SimpleFilesystemTreeService, TreeService};
use crate::fixtures::{DUMMY_DIGEST, TREE_COMPLICATED, TREE_WITH_KEEP};
use crate::treeservice;

async fn make_simplefs_tree_service() -> Box<dyn TreeService> {
    let tmpdir = tempfile::TempDir::new().unwrap().into_path();
    Box::new(SimpleFilesystemTreeService::new(tmpdir).await.unwrap())
}

#[template]
#[rstest]
#[case::memory(treeservice::from_addr("memory://").await.unwrap())]
#[case::simplefs(make_simplefs_tree_service().await)]
pub fn tree_services(#[case] tree_service: impl TreeService) {}

/// Looking up a non-existent tree returns Ok(None).
#[apply(tree_services)]
#[tokio::test]
async fn not_found(tree_service: impl TreeService) {
    assert_eq!(None, tree_service.get(&DUMMY_DIGEST).await.expect("must not fail"));
}

/// Put trees, and read them back.
#[apply(tree_services)]
#[tokio::test]
async fn put_get(tree_service: impl TreeService) {
    for tree in [&*TREE_WITH_KEEP, &*TREE_COMPLICATED] {
        let digest = tree_service
            .put(tree.clone())
            .await
            .expect("put must succeed");
        assert_eq!(tree.digest(), digest, "returned digest must match");

        assert_eq!(
            Some(tree.clone()),
            tree_service.get(&digest).await.expect("get must succeed")
        );

        // putting the same tree again is fine.
        assert_eq!(
            digest,
            tree_service.put(tree.clone()).await.expect("put must succeed")
        );
    }
}
