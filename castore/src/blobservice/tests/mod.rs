//! Test scenarios every [BlobService] needs to pass.
//! The services are provided by an [rstest_reuse] template applied to each
//! test function.

use rstest::*;
use rstest_reuse::{self, *};
use std::io;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::{BlobService, SimpleFilesystemBlobService};
use crate::blobservice;
use crate::fixtures::{
    BLOB_A, BLOB_A_DIGEST, BLOB_B, BLOB_B_DIGEST, EMPTY_BLOB_CONTENTS, EMPTY_BLOB_DIGEST,
    HELLOWORLD_BLOB_CONTENTS, HELLOWORLD_BLOB_DIGEST,
};
use crate::B3Digest;

async fn make_simplefs_blob_service() -> Box<dyn BlobService> {
    let tmpdir = tempfile::TempDir::new().unwrap().into_path();
    Box::new(SimpleFilesystemBlobService::new(tmpdir).await.unwrap())
}

async fn put(blob_service: &impl BlobService, data: &[u8]) -> B3Digest {
    let mut w = blob_service.open_write().await;
    w.write_all(data).await.expect("write must succeed");
    w.close().await.expect("close must succeed")
}

#[template]
#[rstest]
#[case::memory(blobservice::from_addr("memory://").await.unwrap())]
#[case::simplefs(make_simplefs_blob_service().await)]
pub fn blob_services(#[case] blob_service: impl BlobService) {}

#[apply(blob_services)]
#[tokio::test]
async fn has_nonexistent_false(blob_service: impl BlobService) {
    assert!(!blob_service
        .has(&BLOB_A_DIGEST)
        .await
        .expect("must not fail"));
}

/// Unknown blobs are Ok(None), not an error.
#[apply(blob_services)]
#[tokio::test]
async fn not_found(blob_service: impl BlobService) {
    assert!(blob_service
        .open_read(&BLOB_A_DIGEST)
        .await
        .expect("must not fail")
        .is_none());
    assert!(blob_service
        .read_all(&BLOB_A_DIGEST)
        .await
        .expect("must not fail")
        .is_none());
}

#[apply(blob_services)]
#[tokio::test]
async fn write_then_read(blob_service: impl BlobService) {
    let blobs: [(&[u8], &B3Digest); 3] = [
        (&BLOB_A, &BLOB_A_DIGEST),
        (&BLOB_B, &BLOB_B_DIGEST),
        (EMPTY_BLOB_CONTENTS, &EMPTY_BLOB_DIGEST),
    ];

    for (data, expected_digest) in blobs {
        assert_eq!(*expected_digest, put(&blob_service, data).await);
        assert!(blob_service
            .has(expected_digest)
            .await
            .expect("must not fail"));

        let read = blob_service
            .read_all(expected_digest)
            .await
            .expect("must not fail")
            .expect("blob must exist");
        assert_eq!(data, &read[..]);
    }
}

/// Writing the same content twice is fine and yields the same digest.
#[apply(blob_services)]
#[tokio::test]
async fn write_twice(blob_service: impl BlobService) {
    let first = put(&blob_service, HELLOWORLD_BLOB_CONTENTS).await;
    let second = put(&blob_service, HELLOWORLD_BLOB_CONTENTS).await;

    assert_eq!(*HELLOWORLD_BLOB_DIGEST, first);
    assert_eq!(first, second);
}

/// Closing a writer twice returns the same digest.
#[apply(blob_services)]
#[tokio::test]
async fn close_twice(blob_service: impl BlobService) {
    let mut w = blob_service.open_write().await;
    w.write_all(HELLOWORLD_BLOB_CONTENTS)
        .await
        .expect("write must succeed");

    assert_eq!(
        *HELLOWORLD_BLOB_DIGEST,
        w.close().await.expect("close must succeed")
    );
    assert_eq!(
        *HELLOWORLD_BLOB_DIGEST,
        w.close().await.expect("second close must succeed")
    );
}

/// Readers can seek, relative to the start and the end of the blob.
#[apply(blob_services)]
#[tokio::test]
async fn read_at_offset(blob_service: impl BlobService) {
    put(&blob_service, &BLOB_B).await;

    let mut r = blob_service
        .open_read(&BLOB_B_DIGEST)
        .await
        .expect("must not fail")
        .expect("blob must exist");

    assert_eq!(
        1000,
        r.seek(io::SeekFrom::Start(1000)).await.expect("must seek")
    );
    let mut buf = [0; 16];
    r.read_exact(&mut buf).await.expect("must read");
    assert_eq!(&BLOB_B[1000..1016], buf);

    r.seek(io::SeekFrom::End(-4)).await.expect("must seek");
    let mut tail = Vec::new();
    r.read_to_end(&mut tail).await.expect("must read");
    assert_eq!(&BLOB_B[BLOB_B.len() - 4..], &tail[..]);
}
