//! Path keys and prefix matching.
//!
//! A path key is the normalized form of a caller path: no leading or
//! trailing `/`, no empty or `.` segments, `..` resolved. The root is the
//! empty key. Every tree-shaped question about the flat table (children,
//! descendants, rename targets) goes through the helpers here.

use super::error::{DiskError, DiskResult};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Key of the root directory.
pub const ROOT: &str = "";

/// Normalize a caller path into a path key.
///
/// Fails with `InvalidPath` if the path contains a NUL byte or climbs
/// above the root with `..`.
pub fn normalize(path: &str) -> DiskResult<String> {
    if path.contains('\0') {
        return Err(DiskError::invalid_path(path.replace('\0', "\\0")));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(DiskError::invalid_path(path));
                }
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Returns true if `key` is the root.
pub fn is_root(key: &str) -> bool {
    key.is_empty()
}

/// Parent key of `key`, or `None` for the root.
pub fn parent(key: &str) -> Option<&str> {
    if is_root(key) {
        return None;
    }
    Some(key.rfind(SEPARATOR).map_or(ROOT, |idx| &key[..idx]))
}

/// Last segment of `key`. Empty for the root.
pub fn file_name(key: &str) -> &str {
    key.rfind(SEPARATOR).map_or(key, |idx| &key[idx + 1..])
}

/// Join a directory key and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if is_root(dir) {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// The part of `key` below `dir`, if `key` is a strict descendant of it.
fn strip_dir<'a>(key: &'a str, dir: &str) -> Option<&'a str> {
    if is_root(dir) {
        return (!is_root(key)).then_some(key);
    }
    key.strip_prefix(dir)?
        .strip_prefix(SEPARATOR)
        .filter(|rest| !rest.is_empty())
}

/// Returns true if `key` lies anywhere below `dir` (not `dir` itself).
pub fn is_descendant_of(key: &str, dir: &str) -> bool {
    strip_dir(key, dir).is_some()
}

/// Name of `key` relative to `dir` if it is an immediate child.
pub fn child_name<'a>(key: &'a str, dir: &str) -> Option<&'a str> {
    strip_dir(key, dir).filter(|rest| !rest.contains(SEPARATOR))
}

/// Returns true if `key` is an immediate child of `dir`.
pub fn is_child_of(key: &str, dir: &str) -> bool {
    child_name(key, dir).is_some()
}

/// Move `key` from under `from` to under `to`.
///
/// `key` must be `from` itself or one of its descendants.
pub fn rebase(key: &str, from: &str, to: &str) -> Option<String> {
    if key == from {
        return Some(to.to_string());
    }
    strip_dir(key, from).map(|rest| join(to, rest))
}

/// Ancestors of `key`, shortest first, excluding the root and `key` itself.
pub fn ancestors(key: &str) -> impl Iterator<Item = &str> {
    key.match_indices(SEPARATOR).map(move |(idx, _)| &key[..idx])
}
