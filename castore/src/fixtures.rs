use crate::{Attributes, B3Digest, Node, SymlinkTarget, Timestamp, Tree};
use lazy_static::lazy_static;

pub const HELLOWORLD_BLOB_CONTENTS: &[u8] = b"Hello World!";
pub const EMPTY_BLOB_CONTENTS: &[u8] = b"";

lazy_static! {
    pub static ref DUMMY_DIGEST: B3Digest = {
        let u: &[u8; 32] = &[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        u.into()
    };

    pub static ref HELLOWORLD_BLOB_DIGEST: B3Digest = B3Digest::of(HELLOWORLD_BLOB_CONTENTS);
    pub static ref EMPTY_BLOB_DIGEST: B3Digest = B3Digest::of(EMPTY_BLOB_CONTENTS);

    // 2 bytes
    pub static ref BLOB_A: bytes::Bytes = vec![0x00, 0x01].into();
    pub static ref BLOB_A_DIGEST: B3Digest = B3Digest::of(&BLOB_A);

    // 1MB
    pub static ref BLOB_B: bytes::Bytes = (0..255).collect::<Vec<u8>>().repeat(4 * 1024).into();
    pub static ref BLOB_B_DIGEST: B3Digest = B3Digest::of(&BLOB_B);

    pub static ref FIXTURE_MTIME: Timestamp = Timestamp::new(1_700_000_000, 0);

    // Trees
    pub static ref TREE_WITH_KEEP: Tree = {
        let mut tree = Tree::new();
        tree.insert(".keep", Node::File {
            content: vec![EMPTY_BLOB_DIGEST.clone()],
            size: 0,
            device: 0,
            inode: 0,
            links: 1,
            attrs: Attributes::with_mode(0o644).mtime(*FIXTURE_MTIME),
        }).unwrap();
        tree
    };
    pub static ref TREE_COMPLICATED: Tree = {
        let mut tree = Tree::new();
        tree.insert("keep", Node::Directory {
            subtree: TREE_WITH_KEEP.digest(),
            attrs: Attributes::with_mode(0o755).mtime(*FIXTURE_MTIME),
        }).unwrap();
        tree.insert(".keep", Node::File {
            content: vec![EMPTY_BLOB_DIGEST.clone()],
            size: 0,
            device: 0,
            inode: 0,
            links: 1,
            attrs: Attributes::with_mode(0o644).mtime(*FIXTURE_MTIME),
        }).unwrap();
        tree.insert("aa", Node::Symlink {
            target: SymlinkTarget::try_from("/somewhere/else").unwrap(),
            attrs: Attributes::with_mode(0o777).mtime(*FIXTURE_MTIME),
        }).unwrap();
        tree
    };
}
