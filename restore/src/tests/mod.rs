//! Helpers to put small snapshots into memory stores, shared by the tests
//! below.
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use snaprestore_castore::blobservice::BlobService;
use snaprestore_castore::treeservice::TreeService;
use snaprestore_castore::utils::{gen_blob_service, gen_tree_service};
use snaprestore_castore::{Attributes, B3Digest, Node, SymlinkTarget, Timestamp, Tree};
use tokio::io::AsyncWriteExt;

use crate::{Error, Options, Restorer, TreeVisitor};


/// Content blobs are at most this large, so bigger files span several blobs.
const CHUNK_SIZE: usize = 256 * 1024;

/// Describes a snapshot entry.
#[derive(Clone, Debug)]
pub enum TestNode {
    File {
        data: Vec<u8>,
        mode: u32,
        mtime: Timestamp,
        inode: u64,
        links: u64,
    },
    Dir {
        nodes: Vec<(&'static str, TestNode)>,
        mode: u32,
        mtime: Timestamp,
    },
    Symlink {
        target: &'static str,
        mtime: Timestamp,
    },
}

pub fn file(data: impl Into<Vec<u8>>) -> TestNode {
    TestNode::File {
        data: data.into(),
        mode: 0o644,
        mtime: Timestamp::new(1_700_000_000, 0),
        inode: 0,
        links: 1,
    }
}

pub fn dir(nodes: Vec<(&'static str, TestNode)>) -> TestNode {
    TestNode::Dir {
        nodes,
        mode: 0o755,
        mtime: Timestamp::new(1_700_000_000, 0),
    }
}

pub fn symlink(target: &'static str) -> TestNode {
    TestNode::Symlink {
        target,
        mtime: Timestamp::new(1_700_000_000, 0),
    }
}

impl TestNode {
    pub fn mode(mut self, new_mode: u32) -> Self {
        match &mut self {
            TestNode::File { mode, .. } | TestNode::Dir { mode, .. } => *mode = new_mode,
            TestNode::Symlink { .. } => panic!("symlinks have no mode"),
        }
        self
    }

    pub fn mtime(mut self, new_mtime: Timestamp) -> Self {
        match &mut self {
            TestNode::File { mtime, .. }
            | TestNode::Dir { mtime, .. }
            | TestNode::Symlink { mtime, .. } => *mtime = new_mtime,
        }
        self
    }

    /// Makes the file a member of the hardlink group `new_inode`.
    pub fn hardlink(mut self, new_inode: u64, new_links: u64) -> Self {
        match &mut self {
            TestNode::File { inode, links, .. } => {
                *inode = new_inode;
                *links = new_links;
            }
            _ => panic!("only files can be hardlinked"),
        }
        self
    }
}

async fn save_blob(blob_service: &dyn BlobService, data: &[u8]) -> B3Digest {
    let mut writer = blob_service.open_write().await;
    writer.write_all(data).await.expect("must write");
    writer.close().await.expect("must close")
}

async fn save_node(
    blob_service: &dyn BlobService,
    tree_service: &dyn TreeService,
    node: &TestNode,
) -> Node {
    match node {
        TestNode::File {
            data,
            mode,
            mtime,
            inode,
            links,
        } => {
            let mut content = Vec::new();
            for chunk in data.chunks(CHUNK_SIZE) {
                content.push(save_blob(blob_service, chunk).await);
            }
            Node::File {
                content,
                size: data.len() as u64,
                device: if *inode != 0 { 1 } else { 0 },
                inode: *inode,
                links: *links,
                attrs: Attributes::with_mode(*mode).mtime(*mtime),
            }
        }
        TestNode::Dir { nodes, mode, mtime } => Node::Directory {
            subtree: save_tree(blob_service, tree_service, nodes).await,
            attrs: Attributes::with_mode(*mode).mtime(*mtime),
        },
        TestNode::Symlink { target, mtime } => Node::Symlink {
            target: SymlinkTarget::try_from(*target).expect("valid symlink target"),
            attrs: Attributes::with_mode(0o777).mtime(*mtime),
        },
    }
}

fn save_tree<'a>(
    blob_service: &'a dyn BlobService,
    tree_service: &'a dyn TreeService,
    nodes: &'a [(&'static str, TestNode)],
) -> BoxFuture<'a, B3Digest> {
    Box::pin(async move {
        let mut tree = Tree::new();
        for (name, node) in nodes {
            let node = save_node(blob_service, tree_service, node).await;
            tree.insert(*name, node).expect("no duplicate names");
        }
        tree_service.put(tree).await.expect("must put tree")
    })
}

/// Memory stores holding any number of snapshots.
pub struct TestStore {
    pub blob_service: Arc<dyn BlobService>,
    pub tree_service: Arc<dyn TreeService>,
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            blob_service: gen_blob_service(),
            tree_service: gen_tree_service(),
        }
    }

    /// Saves a snapshot with the given entries at its root, returning the
    /// root tree digest.
    pub async fn save(&self, nodes: Vec<(&'static str, TestNode)>) -> B3Digest {
        save_tree(
            self.blob_service.as_ref(),
            self.tree_service.as_ref(),
            &nodes,
        )
        .await
    }

    pub fn restorer(
        &self,
        root: B3Digest,
        options: Options,
    ) -> Restorer<Arc<dyn BlobService>, Arc<dyn TreeService>> {
        Restorer::new(
            self.blob_service.clone(),
            self.tree_service.clone(),
            root,
            options,
        )
    }
}

/// Errors passed to an error hook, by location, in the order reported.
pub type ErrorLog = Arc<Mutex<Vec<(String, String)>>>;

/// Installs an error hook recording every error and continuing.
pub fn record_errors<BS, TS>(restorer: &mut Restorer<BS, TS>) -> ErrorLog
where
    BS: BlobService,
    TS: TreeService,
{
    let log = ErrorLog::default();
    restorer.set_error_hook({
        let log = log.clone();
        move |location, err| {
            log.lock().push((location.to_string(), err.to_string()));
            Ok(())
        }
    });
    log
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Enter(String),
    Visit(String),
    Leave(String, bool),
}

/// A [TreeVisitor] recording all calls.
#[derive(Default)]
pub struct RecordingVisitor {
    pub events: Vec<Event>,
    /// Entering the directory at this location fails.
    pub fail_enter: Option<&'static str>,
}

#[async_trait]
impl TreeVisitor for RecordingVisitor {
    async fn enter_dir(&mut self, _node: &Node, _target: &Path, location: &str) -> Result<(), Error> {
        if self.fail_enter == Some(location) {
            return Err(Error::InvalidNodeName(location.to_string()));
        }
        self.events.push(Event::Enter(location.to_string()));
        Ok(())
    }

    async fn visit_node(
        &mut self,
        _node: &Node,
        _target: &Path,
        location: &str,
    ) -> Result<(), Error> {
        self.events.push(Event::Visit(location.to_string()));
        Ok(())
    }

    async fn leave_dir(
        &mut self,
        _node: &Node,
        _target: &Path,
        location: &str,
        restored: bool,
    ) -> Result<(), Error> {
        self.events.push(Event::Leave(location.to_string(), restored));
        Ok(())
    }
}
