//! Path resolution and path-name helpers.

use std::fs;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use crate::spec::{FsError, FsResult};

////////////////////////////////////////////////////////////////////////////////
// #region Resolution

/// Resolve a raw path string or path handle into a canonical absolute path.
///
/// The target does not need to exist. The longest existing ancestor is
/// canonicalized (resolving symlinks) and the missing tail is appended after
/// lexical `.`/`..` normalization. Relative input is anchored at the current
/// working directory. Resolving an already resolved path returns it unchanged.
///
/// Fails with [`FsError::InvalidPath`] for empty or whitespace-only input.
pub fn resolve<P: AsRef<Path>>(input: P) -> FsResult<PathBuf> {
    let path_raw = check_blank(input.as_ref())?;
    let path_abs = absolutize_path(path_raw)?;
    Ok(canonicalize_existing_prefix(&path_abs))
}

pub(crate) fn check_blank(path: &Path) -> FsResult<&Path> {
    let c_raw = path.to_string_lossy();
    if c_raw.trim().is_empty() {
        return Err(FsError::InvalidPath(c_raw.to_string()));
    }
    Ok(path)
}

fn absolutize_path(path: &Path) -> FsResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let path_cwd = std::env::current_dir().map_err(|e| FsError::io(path, e))?;
    Ok(path_cwd.join(path))
}

fn canonicalize_existing_prefix(path_abs: &Path) -> PathBuf {
    let l_parts: Vec<Component<'_>> = path_abs.components().collect();
    for n_keep in (1..=l_parts.len()).rev() {
        let path_head: PathBuf = l_parts[..n_keep].iter().collect();
        if let Ok(path_real) = fs::canonicalize(&path_head) {
            return push_normalized(path_real, &l_parts[n_keep..]);
        }
    }
    push_normalized(PathBuf::new(), &l_parts)
}

fn push_normalized(mut path_out: PathBuf, l_parts: &[Component<'_>]) -> PathBuf {
    for part in l_parts {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                path_out.pop();
            }
            other => path_out.push(other.as_os_str()),
        }
    }
    path_out
}

/// Whether two inputs resolve to the same location.
pub fn is_same_path<P, Q>(a: P, b: Q) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    match (resolve(a), resolve(b)) {
        (Ok(path_a), Ok(path_b)) => path_a == path_b,
        _ => false,
    }
}

/// Whether `child` resolves to `parent` itself or to a location beneath it.
pub fn is_nested_or_same<P, Q>(parent: P, child: Q) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    match (resolve(parent), resolve(child)) {
        (Ok(path_parent), Ok(path_child)) => path_child.starts_with(&path_parent),
        _ => false,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NameHelpers

/// Parent directory of `path` with a trailing separator, `""` when there is none.
pub fn dir_name<P: AsRef<Path>>(path: P) -> String {
    let Some(path_parent) = path.as_ref().parent() else {
        return String::new();
    };
    let mut c_parent = path_parent.to_string_lossy().to_string();
    if c_parent.is_empty() {
        return c_parent;
    }
    if !c_parent.ends_with(MAIN_SEPARATOR) && !c_parent.ends_with('/') {
        c_parent.push(MAIN_SEPARATOR);
    }
    c_parent
}

/// Final component of `path`, `""` when there is none.
pub fn file_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Final component without its extension.
///
/// Dot-files such as `.profile` have no extension and are returned whole.
pub fn file_name_no_extension<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Extension of the final component without the dot, `""` when there is none.
pub fn file_extension<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .extension()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
