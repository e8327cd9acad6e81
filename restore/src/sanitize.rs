//! Checks on untrusted node names, and helpers for the forward-slash
//! locations reported to callers.
use std::path::{Component, Path, PathBuf};

use crate::Error;

/// Returns the path of the child `name` below `parent`.
///
/// Names that are empty, `.` or `..`, or contain a path separator or NUL are
/// rejected, as well as anything else not ending up as a direct child of
/// `parent` after a lexical join.
pub fn sanitize(parent: &Path, name: &str) -> Result<PathBuf, Error> {
    let invalid = || Error::InvalidNodeName(name.to_string());

    if name.is_empty() || name == "." || name == ".." {
        return Err(invalid());
    }
    if name.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
        return Err(invalid());
    }

    // catches anything the platform would interpret as a prefix or root.
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == name => {}
        _ => return Err(invalid()),
    }

    let joined = parent.join(name);
    if joined.parent() != Some(parent) {
        return Err(invalid());
    }

    Ok(joined)
}

/// Appends `name` to a location, the root location being `/`.
pub fn join_location(location: &str, name: &str) -> String {
    if location.ends_with('/') {
        format!("{}{}", location, name)
    } else {
        format!("{}/{}", location, name)
    }
}

/// Returns whether `path` is `base` or below it, comparing whole path
/// components.
pub fn has_path_prefix(base: &str, path: &str) -> bool {
    let base = base.trim_end_matches('/');
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || base.is_empty(),
        None => false,
    }
}
