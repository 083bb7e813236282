//! Size aggregation for files, directory trees and remote resources.

use std::fs;
use std::path::Path;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::warn;

use crate::remote::{is_remote_reference, head_content_length};
use crate::spec::{FsError, FsResult, SpecEntry, SpecFsOptions};
use crate::util::{calculate_worker_limit, log_outcome};
use crate::walk::walk;

const N_KB: u64 = 1024;
const N_MB: u64 = 1024 * N_KB;
const N_GB: u64 = 1024 * N_MB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumSizeMode {
    /// Bytes of non-directory entries only.
    Content,
    /// Content plus the nominal length each descendant directory reports.
    Length,
}

////////////////////////////////////////////////////////////////////////////////
// #region FileLength

/// Byte length of a local file, or `Content-Length` of an `http(s)` reference.
///
/// Returns `0` when the length cannot be determined.
pub fn file_length<P: AsRef<Path>>(path: P) -> u64 {
    file_length_with(path, &SpecFsOptions::default())
}

/// [`file_length`] with explicit options (remote timeout).
pub fn file_length_with<P: AsRef<Path>>(path: P, spec_fs_options: &SpecFsOptions) -> u64 {
    let path_file = path.as_ref();
    if let Some(c_ref) = path_file.to_str()
        && is_remote_reference(c_ref)
    {
        return head_content_length(c_ref, spec_fs_options.duration_remote_timeout).unwrap_or(0);
    }
    log_outcome("file_length", try_file_length(path_file)).unwrap_or(0)
}

/// Byte length of a local regular file.
pub fn try_file_length<P: AsRef<Path>>(path: P) -> FsResult<u64> {
    let path_file = path.as_ref();
    let stat_file = fs::metadata(path_file).map_err(|e| map_missing(path_file, e))?;
    if !stat_file.is_file() {
        return Err(FsError::NotAFile(path_file.to_path_buf()));
    }
    Ok(stat_file.len())
}

fn map_missing(path: &Path, e: std::io::Error) -> FsError {
    if e.kind() == std::io::ErrorKind::NotFound {
        FsError::NotFound(path.to_path_buf())
    } else {
        FsError::io(path, e)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DirectorySize

/// Sum of the byte lengths of every file below `path`. `0` on failure.
pub fn dir_size<P: AsRef<Path>>(path: P) -> u64 {
    log_outcome("dir_size", try_dir_size(path, &SpecFsOptions::default())).unwrap_or(0)
}

/// Fallible [`dir_size`].
pub fn try_dir_size<P: AsRef<Path>>(path: P, spec_fs_options: &SpecFsOptions) -> FsResult<u64> {
    aggregate_dir(path.as_ref(), EnumSizeMode::Content, spec_fs_options)
}

/// File bytes plus the nominal metadata length of every descendant directory.
/// `0` on failure.
pub fn dir_length<P: AsRef<Path>>(path: P) -> u64 {
    log_outcome("dir_length", try_dir_length(path, &SpecFsOptions::default())).unwrap_or(0)
}

/// Fallible [`dir_length`].
pub fn try_dir_length<P: AsRef<Path>>(path: P, spec_fs_options: &SpecFsOptions) -> FsResult<u64> {
    aggregate_dir(path.as_ref(), EnumSizeMode::Length, spec_fs_options)
}

/// Directory content size for directories, [`file_length`] for everything else.
pub fn size_of<P: AsRef<Path>>(path: P) -> u64 {
    let path_target = path.as_ref();
    if path_target.is_dir() {
        return dir_size(path_target);
    }
    file_length(path_target)
}

fn aggregate_dir(
    path_dir: &Path,
    enum_size_mode: EnumSizeMode,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<u64> {
    let l_entries_top: Vec<SpecEntry> = walk(path_dir, false, None)?.collect::<FsResult<_>>()?;

    let n_workers_max = calculate_worker_limit(spec_fs_options.num_workers_max);
    if n_workers_max <= 1 || l_entries_top.len() <= 1 {
        return sum_entries_serial(&l_entries_top, enum_size_mode);
    }

    let thread_pool = match ThreadPoolBuilder::new().num_threads(n_workers_max).build() {
        Ok(v) => v,
        Err(e) => {
            warn!(
                workers = n_workers_max,
                error = %e,
                "failed to initialize thread pool; fallback to serial size walk"
            );
            return sum_entries_serial(&l_entries_top, enum_size_mode);
        }
    };
    thread_pool.install(|| {
        l_entries_top
            .par_iter()
            .map(|spec_entry| size_of_entry(spec_entry, enum_size_mode))
            .try_reduce(|| 0, |a, b| Ok(a + b))
    })
}

fn sum_entries_serial(l_entries: &[SpecEntry], enum_size_mode: EnumSizeMode) -> FsResult<u64> {
    l_entries
        .iter()
        .map(|spec_entry| size_of_entry(spec_entry, enum_size_mode))
        .sum()
}

fn size_of_entry(spec_entry: &SpecEntry, enum_size_mode: EnumSizeMode) -> FsResult<u64> {
    if !spec_entry.if_is_dir {
        return Ok(spec_entry.size_bytes);
    }
    let n_nominal = nominal_length(spec_entry, enum_size_mode)?;
    if spec_entry.if_is_symlink {
        return Ok(n_nominal);
    }

    let mut n_total = n_nominal;
    for res_entry in walk(&spec_entry.path, true, None)? {
        let spec_child = res_entry?;
        n_total += if spec_child.if_is_dir {
            nominal_length(&spec_child, enum_size_mode)?
        } else {
            spec_child.size_bytes
        };
    }
    Ok(n_total)
}

fn nominal_length(spec_entry: &SpecEntry, enum_size_mode: EnumSizeMode) -> FsResult<u64> {
    match enum_size_mode {
        EnumSizeMode::Content => Ok(0),
        EnumSizeMode::Length => fs::symlink_metadata(&spec_entry.path)
            .map(|v| v.len())
            .map_err(|e| FsError::io(&spec_entry.path, e)),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Formatting

/// Render a byte count with a 1024-based unit and three decimals.
///
/// ```
/// assert_eq!(filekit_io_fs::format_fit_memory_size(1536), "1.500KB");
/// ```
pub fn format_fit_memory_size(n_bytes: u64) -> String {
    let v = n_bytes as f64;
    if n_bytes < N_KB {
        format!("{v:.3}B")
    } else if n_bytes < N_MB {
        format!("{:.3}KB", v / N_KB as f64)
    } else if n_bytes < N_GB {
        format!("{:.3}MB", v / N_MB as f64)
    } else {
        format!("{:.3}GB", v / N_GB as f64)
    }
}

/// Formatted [`file_length`]; `""` when the length cannot be determined.
pub fn file_size_string<P: AsRef<Path>>(path: P) -> String {
    let path_file = path.as_ref();
    let b_is_remote = path_file.to_str().is_some_and(is_remote_reference);
    if !b_is_remote && !path_file.is_file() {
        return String::new();
    }
    format_fit_memory_size(file_length(path_file))
}

/// Formatted [`dir_size`]; `""` on failure.
pub fn dir_size_string<P: AsRef<Path>>(path: P) -> String {
    log_outcome(
        "dir_size_string",
        try_dir_size(path, &SpecFsOptions::default()),
    )
    .map(format_fit_memory_size)
    .unwrap_or_default()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
