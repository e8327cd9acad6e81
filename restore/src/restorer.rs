use std::collections::HashSet;
use std::path::{Path, PathBuf};

use snaprestore_castore::{blobservice::BlobService, treeservice::TreeService, B3Digest, Node};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::materialize::Materializer;
use crate::verify::{verify_all, FileCollector};
use crate::{
    abort_on_error, select_all, Error, ErrorHook, Options, RestoreStats, SelectFilter, Selection,
    TreeWalker,
};

/// Location of the snapshot root.
const ROOT_LOCATION: &str = "/";

/// Restores the snapshot rooted at one tree into a target directory.
///
/// A Restorer is bound to one snapshot and one set of [Options]. After a call
/// to [Restorer::restore_to], [Restorer::verify_files] checks the files
/// written by it.
pub struct Restorer<BS, TS> {
    blob_service: BS,
    tree_service: TS,
    root: B3Digest,
    options: Options,

    select_filter: SelectFilter,
    error_hook: ErrorHook,

    /// Locations of the files restored by the last run.
    restored: HashSet<String>,
    stats: RestoreStats,
}

impl<BS, TS> Restorer<BS, TS>
where
    BS: BlobService,
    TS: TreeService,
{
    /// Creates a Restorer selecting everything and aborting on the first error.
    pub fn new(blob_service: BS, tree_service: TS, root: B3Digest, options: Options) -> Self {
        Self {
            blob_service,
            tree_service,
            root,
            options,
            select_filter: select_all(),
            error_hook: abort_on_error(),
            restored: HashSet::new(),
            stats: RestoreStats::default(),
        }
    }

    /// Sets the filter deciding which entries are restored.
    pub fn set_select_filter<F>(&mut self, filter: F)
    where
        F: Fn(&str, &Path, &Node) -> Selection + Send + Sync + 'static,
    {
        self.select_filter = Box::new(filter);
    }

    /// Sets the hook invoked for errors concerning a single entry.
    /// Returning `Ok(())` continues with the next entry.
    pub fn set_error_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&str, Error) -> Result<(), Error> + Send + 'static,
    {
        self.error_hook = Box::new(hook);
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Counters of the last restore run.
    pub fn stats(&self) -> &RestoreStats {
        &self.stats
    }

    /// Restores the snapshot below `target`, creating it if needed.
    ///
    /// Errors concerning single entries are passed to the error hook. Failing
    /// to create the target itself, cancellation, and errors returned by the
    /// hook end the run. Nothing written is rolled back.
    #[instrument(skip_all, fields(root = %self.root, target = %target.as_ref().display(), indicatif.pb_show=1), err)]
    pub async fn restore_to(
        &mut self,
        cancel: &CancellationToken,
        target: impl AsRef<Path>,
    ) -> Result<(), Error> {
        let span = Span::current();
        span.pb_set_style(&snaprestore_tracing::PB_SPINNER_STYLE);
        span.pb_set_message("restoring");

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let target = absolute(target.as_ref())?;
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(|e| Error::UnableToCreate(target.clone(), e))?;

        self.restored.clear();
        self.stats = RestoreStats::default();

        let mut materializer = Materializer::new(
            &self.blob_service,
            &self.options,
            cancel,
            &mut self.restored,
            &mut self.stats,
        );
        let mut walker = TreeWalker::new(
            &self.tree_service,
            self.select_filter.as_ref(),
            self.error_hook.as_mut(),
            cancel,
        );
        walker
            .traverse(&self.root, &target, ROOT_LOCATION, &mut materializer)
            .await?;

        info!(stats = %self.stats, "restore done");
        Ok(())
    }

    /// Checks the files written by the last [Restorer::restore_to] call
    /// below `target`.
    ///
    /// Mismatches are passed to the error hook. Returns the number of files
    /// verified successfully.
    #[instrument(skip_all, fields(root = %self.root, target = %target.as_ref().display(), indicatif.pb_show=1), err)]
    pub async fn verify_files(
        &mut self,
        cancel: &CancellationToken,
        target: impl AsRef<Path>,
    ) -> Result<usize, Error> {
        let span = Span::current();
        span.pb_set_style(&snaprestore_tracing::PB_PROGRESS_STYLE);
        span.pb_set_message("verifying");

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let target = absolute(target.as_ref())?;

        let mut collector = FileCollector::new(&self.restored);
        TreeWalker::new(
            &self.tree_service,
            self.select_filter.as_ref(),
            self.error_hook.as_mut(),
            cancel,
        )
        .traverse(&self.root, &target, ROOT_LOCATION, &mut collector)
        .await?;

        let verified = verify_all(
            &self.blob_service,
            cancel,
            collector.jobs,
            self.options.verify_workers,
            self.error_hook.as_mut(),
        )
        .await?;

        info!(verified, "verification done");
        Ok(verified)
    }
}

/// Makes `path` absolute, relative to the current directory.
fn absolute(path: &Path) -> Result<PathBuf, Error> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(|e| Error::UnableToStat(path.to_path_buf(), e))?;
    Ok(cwd.join(path))
}
