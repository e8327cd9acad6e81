//! Restores snapshots stored in a content-addressed store into a local
//! directory, and verifies the result.

mod errors;
mod hardlinks;
mod materialize;
mod metadata;
mod options;
mod overwrite;
mod restorer;
mod sanitize;
mod select;
mod stats;
mod verify;
mod walk;

pub use errors::Error;
pub use metadata::apply_metadata;
pub use options::{InvalidOverwriteBehavior, Options, OverwriteBehavior};
pub use overwrite::{should_write, EntryKind, ExistingEntry, OverwriteDecision};
pub use restorer::Restorer;
pub use sanitize::{has_path_prefix, join_location, sanitize};
pub use select::{include_prefixes, select_all, SelectFilter, Selection};
pub use stats::RestoreStats;
pub use walk::{abort_on_error, ErrorHook, TreeVisitor, TreeWalker};

#[cfg(test)]
mod tests;
