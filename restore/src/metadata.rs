use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nix::sys::stat::{utimensat, UtimensatFlags};
use nix::sys::time::TimeSpec;
use nix::unistd::{fchownat, FchownatFlags, Gid, Uid};
use snaprestore_castore::{Attributes, Timestamp};
use tracing::{debug, instrument};

use crate::Error;

fn timespec(t: Timestamp) -> TimeSpec {
    TimeSpec::new(t.secs as _, t.nanos as _)
}

/// Applies the attributes to the entry at `path`, never following symlinks.
///
/// Ownership is only changed if `chown` is set, as this needs root. Times are
/// set last, as every other step may change them.
#[instrument(level = "trace", skip(attrs), err)]
pub async fn apply_metadata(
    path: &Path,
    attrs: &Attributes,
    is_symlink: bool,
    chown: bool,
) -> Result<(), Error> {
    let err = |e: io::Error| Error::UnableToSetMetadata(path.to_path_buf(), e);

    // before the mode, chown clears setuid and setgid.
    if chown {
        fchownat(
            None,
            path,
            Some(Uid::from_raw(attrs.uid)),
            Some(Gid::from_raw(attrs.gid)),
            FchownatFlags::NoFollowSymlink,
        )
        .map_err(|e| err(e.into()))?;
    }

    // symlinks don't have a mode of their own on Linux.
    if !is_symlink {
        tokio::fs::set_permissions(path, Permissions::from_mode(attrs.mode & 0o7777))
            .await
            .map_err(err)?;
    }

    for xattr in &attrs.xattrs {
        // Linux only allows user.* attributes on regular files and directories.
        if is_symlink && xattr.name.starts_with("user.") {
            debug!(path = %path.display(), name = %xattr.name, "skipping user xattr on symlink");
            continue;
        }
        xattr::set(path, &xattr.name, &xattr.value).map_err(err)?;
    }

    if !attrs.generic.is_empty() {
        debug!(path = %path.display(), generic = ?attrs.generic, "generic attributes are not supported on this platform");
    }

    utimensat(
        None,
        path,
        &timespec(attrs.atime()),
        &timespec(attrs.mtime),
        UtimensatFlags::NoFollowSymlink,
    )
    .map_err(|e| err(e.into()))?;

    Ok(())
}
