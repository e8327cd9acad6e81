use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use snaprestore_castore::{blobservice::BlobService, B3Digest, Node};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::materialize::load_blob;
use crate::walk::TreeVisitor;
use crate::Error;

/// A file to check against its node.
#[derive(Debug)]
pub(crate) struct VerifyJob {
    pub location: String,
    pub path: PathBuf,
    pub content: Vec<B3Digest>,
    pub size: u64,
}

/// Collects the files written by the previous restore run while walking the
/// snapshot again.
pub(crate) struct FileCollector<'a> {
    restored: &'a HashSet<String>,
    pub jobs: Vec<VerifyJob>,
}

impl<'a> FileCollector<'a> {
    pub fn new(restored: &'a HashSet<String>) -> Self {
        Self {
            restored,
            jobs: Vec::new(),
        }
    }
}

#[async_trait]
impl<'a> TreeVisitor for FileCollector<'a> {
    async fn enter_dir(&mut self, _: &Node, _: &Path, _: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn visit_node(&mut self, node: &Node, target: &Path, location: &str) -> Result<(), Error> {
        if let Node::File { content, size, .. } = node {
            if self.restored.contains(location) {
                self.jobs.push(VerifyJob {
                    location: location.to_string(),
                    path: target.to_path_buf(),
                    content: content.clone(),
                    size: *size,
                });
            } else {
                debug!(location, "not restored, not verifying");
            }
        }
        Ok(())
    }

    async fn leave_dir(&mut self, _: &Node, _: &Path, _: &str, _: bool) -> Result<(), Error> {
        Ok(())
    }
}

/// Checks type, size and content of a single file.
///
/// Files the restore trusted without rewriting them are read back too, so
/// changes hidden behind an unchanged size and mtime show up here.
#[instrument(level = "trace", skip_all, fields(path = %job.path.display()), err)]
pub(crate) async fn verify_file<BS>(
    blob_service: &BS,
    cancel: &CancellationToken,
    job: &VerifyJob,
) -> Result<(), Error>
where
    BS: BlobService,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let metadata = tokio::fs::symlink_metadata(&job.path)
        .await
        .map_err(|e| Error::UnableToStat(job.path.clone(), e))?;

    if !metadata.is_file() {
        return Err(Error::NotAFile(job.path.clone()));
    }
    if metadata.len() != job.size {
        return Err(Error::SizeMismatch {
            path: job.path.clone(),
            expected: job.size,
            actual: metadata.len(),
        });
    }

    let read_err = |e| Error::UnableToRead(job.path.clone(), e);
    let mut file = tokio::fs::File::open(&job.path).await.map_err(read_err)?;
    let mut buf = Vec::new();

    for digest in &job.content {
        let expected = load_blob(blob_service, cancel, digest).await?;

        buf.resize(expected.len(), 0);
        file.read_exact(&mut buf).await.map_err(read_err)?;

        if buf != expected {
            return Err(Error::ContentMismatch(job.path.clone(), digest.clone()));
        }
    }

    Ok(())
}

/// Verifies all collected files, up to `workers` at a time, passing failures
/// to the error hook in traversal order.
///
/// Returns the number of files verified successfully.
pub(crate) async fn verify_all<BS>(
    blob_service: &BS,
    cancel: &CancellationToken,
    jobs: Vec<VerifyJob>,
    workers: usize,
    error_hook: &mut (dyn FnMut(&str, Error) -> Result<(), Error> + Send),
) -> Result<usize, Error>
where
    BS: BlobService,
{
    let span = Span::current();
    span.pb_set_length(jobs.len() as u64);

    let mut results = stream::iter(jobs.iter())
        .map(|job| async move { (job, verify_file(blob_service, cancel, job).await) })
        .buffered(workers.max(1));

    let mut verified = 0;
    while let Some((job, res)) = results.next().await {
        span.pb_inc(1);
        match res {
            Ok(()) => verified += 1,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                debug!(location = %job.location, err = %e, "verification failed");
                error_hook(&job.location, e)?;
            }
        }
    }

    Ok(verified)
}
