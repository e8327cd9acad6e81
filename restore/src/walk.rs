use std::path::Path;

use async_trait::async_trait;
use futures::future::BoxFuture;
use snaprestore_castore::{treeservice::TreeService, B3Digest, Node, Tree};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::sanitize::{join_location, sanitize};
use crate::select::Selection;
use crate::Error;

/// Callbacks invoked while walking a snapshot.
///
/// `target` is the sanitized path the node is restored to, `location` the
/// forward-slash path of the node inside the snapshot.
#[async_trait]
pub trait TreeVisitor: Send {
    /// Called before descending into a directory.
    /// If this fails, the directory's children are skipped.
    async fn enter_dir(&mut self, node: &Node, target: &Path, location: &str) -> Result<(), Error>;

    /// Called for selected files and symlinks, and for selected directories
    /// not descended into.
    async fn visit_node(&mut self, node: &Node, target: &Path, location: &str)
        -> Result<(), Error>;

    /// Called after all children of a directory have been processed.
    /// `restored` is set if the directory or anything below it was selected.
    async fn leave_dir(
        &mut self,
        node: &Node,
        target: &Path,
        location: &str,
        restored: bool,
    ) -> Result<(), Error>;
}

/// Invoked for every error concerning a single entry, with the entry's
/// location. Returning an error aborts the run with it.
pub type ErrorHook = Box<dyn FnMut(&str, Error) -> Result<(), Error> + Send>;

/// The default [ErrorHook], aborting on the first error.
pub fn abort_on_error() -> ErrorHook {
    Box::new(|_, err| Err(err))
}

#[instrument(level = "trace", skip(tree_service, cancel), err)]
async fn load_tree<TS>(
    tree_service: &TS,
    cancel: &CancellationToken,
    digest: &B3Digest,
) -> Result<Tree, Error>
where
    TS: TreeService,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let tree = tokio::select! {
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        tree = tree_service.get(digest) => tree,
    };

    match tree {
        Ok(Some(tree)) => Ok(tree),
        Ok(None) => Err(Error::ObjectLoad(digest.clone(), "tree not found".to_string())),
        Err(e) => Err(Error::ObjectLoad(digest.clone(), e.to_string())),
    }
}

/// Walks a snapshot depth-first, in name order, invoking a [TreeVisitor].
pub struct TreeWalker<'a, TS> {
    tree_service: &'a TS,
    select: &'a (dyn Fn(&str, &Path, &Node) -> Selection + Send + Sync),
    error_hook: &'a mut (dyn FnMut(&str, Error) -> Result<(), Error> + Send),
    cancel: &'a CancellationToken,
}

impl<'a, TS> TreeWalker<'a, TS>
where
    TS: TreeService,
{
    pub fn new(
        tree_service: &'a TS,
        select: &'a (dyn Fn(&str, &Path, &Node) -> Selection + Send + Sync),
        error_hook: &'a mut (dyn FnMut(&str, Error) -> Result<(), Error> + Send),
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            tree_service,
            select,
            error_hook,
            cancel,
        }
    }

    /// Passes an error to the error hook. Cancellation bypasses the hook.
    pub fn report(&mut self, location: &str, err: Error) -> Result<(), Error> {
        if err.is_cancelled() {
            return Err(err);
        }

        warn!(location, err = %err, "error during restore");
        (self.error_hook)(location, err)
    }

    /// Visits the tree `tree_id`, restored to `target` and located at
    /// `location` in the snapshot.
    ///
    /// Returns whether anything in the tree was selected.
    pub fn traverse<'s, V>(
        &'s mut self,
        tree_id: &'s B3Digest,
        target: &'s Path,
        location: &'s str,
        visitor: &'s mut V,
    ) -> BoxFuture<'s, Result<bool, Error>>
    where
        V: TreeVisitor,
    {
        Box::pin(async move {
            let tree = match load_tree(self.tree_service, self.cancel, tree_id).await {
                Ok(tree) => tree,
                Err(e) => {
                    self.report(location, e)?;
                    return Ok(false);
                }
            };

            let mut selected_any = false;

            for (name, node) in tree.nodes() {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let child_target = match sanitize(target, name) {
                    Ok(child_target) => child_target,
                    Err(e) => {
                        self.report(location, e)?;
                        continue;
                    }
                };
                let child_location = join_location(location, name);

                let Selection {
                    selected,
                    may_descend,
                } = (self.select)(&child_location, &child_target, node);
                selected_any |= selected;

                match node {
                    Node::Directory { subtree, .. } if may_descend => {
                        if let Err(e) = visitor
                            .enter_dir(node, &child_target, &child_location)
                            .await
                        {
                            self.report(&child_location, e)?;
                            continue;
                        }

                        let child_selected = self
                            .traverse(subtree, &child_target, &child_location, visitor)
                            .await?;
                        selected_any |= child_selected;

                        if let Err(e) = visitor
                            .leave_dir(
                                node,
                                &child_target,
                                &child_location,
                                selected || child_selected,
                            )
                            .await
                        {
                            self.report(&child_location, e)?;
                        }
                    }
                    _ if selected => {
                        if let Err(e) = visitor
                            .visit_node(node, &child_target, &child_location)
                            .await
                        {
                            self.report(&child_location, e)?;
                        }
                    }
                    _ => {
                        debug!(location = %child_location, "not selected");
                    }
                }
            }

            Ok(selected_any)
        })
    }
}
