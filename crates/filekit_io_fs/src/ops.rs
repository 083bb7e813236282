//! Mutating filesystem operations: create, copy, move, rename and delete.
//!
//! Every operation comes in two shapes. The plain form returns `bool` and
//! logs the failure; the `try_` form returns [`FsResult`]. Composite
//! operations built from many single-entry steps also have a `_with_report`
//! form that hands back the [`ReportFsOp`] even when a step failed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::path::{check_blank, resolve};
use crate::policy::{ReplacePolicy, decide};
use crate::report::{ReportFsOp, ReportFsOpBuilder};
use crate::spec::{EnumConflictDecision, FsError, FsResult, SpecEntry, SpecFsOptions};
use crate::util::{
    SpecCopyOutcome, copy_file_atomically, create_symbolic_link, log_outcome, remove_entry,
};
use crate::walk::{TypeEntryFilter, walk};

////////////////////////////////////////////////////////////////////////////////
// #region Create

/// Ensure a directory exists at `path`, creating missing ancestors.
pub fn create_or_exists_dir<P: AsRef<Path>>(path: P) -> bool {
    log_outcome("create_or_exists_dir", try_create_or_exists_dir(path)).is_some()
}

/// Fallible [`create_or_exists_dir`].
pub fn try_create_or_exists_dir<P: AsRef<Path>>(path: P) -> FsResult<()> {
    let path_dir = check_blank(path.as_ref())?;
    if path_dir.is_dir() {
        return Ok(());
    }
    if fs::symlink_metadata(path_dir).is_ok() {
        return Err(FsError::NotADirectory(path_dir.to_path_buf()));
    }
    fs::create_dir_all(path_dir).map_err(|e| FsError::io(path_dir, e))
}

/// Ensure a regular file exists at `path`, creating parents and an empty file.
pub fn create_or_exists_file<P: AsRef<Path>>(path: P) -> bool {
    log_outcome("create_or_exists_file", try_create_or_exists_file(path)).is_some()
}

/// Fallible [`create_or_exists_file`].
pub fn try_create_or_exists_file<P: AsRef<Path>>(path: P) -> FsResult<()> {
    let path_file = check_blank(path.as_ref())?;
    if path_file.is_file() {
        return Ok(());
    }
    if path_file.is_dir() {
        return Err(FsError::NotAFile(path_file.to_path_buf()));
    }
    ensure_parent(path_file)?;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path_file)
        .map(|_| ())
        .map_err(|e| FsError::io(path_file, e))
}

/// Replace whatever sits at `path` with a fresh empty file.
///
/// An existing directory is removed only when it is empty.
pub fn create_file_by_delete_old_file<P: AsRef<Path>>(path: P) -> bool {
    log_outcome(
        "create_file_by_delete_old_file",
        try_create_file_by_delete_old_file(path),
    )
    .is_some()
}

/// Fallible [`create_file_by_delete_old_file`].
pub fn try_create_file_by_delete_old_file<P: AsRef<Path>>(path: P) -> FsResult<()> {
    let path_file = check_blank(path.as_ref())?;
    match fs::symlink_metadata(path_file) {
        Ok(v) if v.is_dir() => {
            fs::remove_dir(path_file).map_err(|e| FsError::io(path_file, e))?;
        }
        Ok(_) => fs::remove_file(path_file).map_err(|e| FsError::io(path_file, e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(FsError::io(path_file, e)),
    }
    ensure_parent(path_file)?;
    fs::File::create(path_file)
        .map(|_| ())
        .map_err(|e| FsError::io(path_file, e))
}

fn ensure_parent(path: &Path) -> FsResult<()> {
    match path.parent() {
        Some(path_parent) if !path_parent.as_os_str().is_empty() => {
            try_create_or_exists_dir(path_parent)
        }
        _ => Ok(()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CopyAndMove

/// Copy one file, consulting `policy` once if `dst` already exists.
///
/// ```no_run
/// use filekit_io_fs::{AlwaysReplace, copy_file};
///
/// assert!(copy_file("notes.txt", "backup/notes.txt", &AlwaysReplace));
/// ```
pub fn copy_file<P, Q>(src: P, dst: Q, policy: &dyn ReplacePolicy) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let res = try_copy_file(src, dst, policy, &SpecFsOptions::default());
    log_outcome("copy_file", res).is_some()
}

/// Fallible [`copy_file`]; returns the number of bytes written.
///
/// The bytes land in a temporary sibling of `dst` that is renamed into place,
/// so `dst` is either untouched or complete.
pub fn try_copy_file<P, Q>(
    src: P,
    dst: Q,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_src = resolve(src)?;
    let path_dst = resolve(dst)?;
    if !path_src.exists() {
        return Err(FsError::NotFound(path_src));
    }
    if !path_src.is_file() {
        return Err(FsError::NotAFile(path_src));
    }
    if path_src == path_dst {
        return Err(FsError::SelfReference {
            path_src,
            path_dst,
        });
    }
    copy_file_resolved(&path_src, &path_dst, policy, spec_fs_options).map(|v| v.n_bytes)
}

fn copy_file_resolved(
    path_src: &Path,
    path_dst: &Path,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<SpecCopyOutcome> {
    if path_dst.is_dir() {
        return Err(FsError::NotAFile(path_dst.to_path_buf()));
    }
    ensure_parent(path_dst)?;
    if fs::symlink_metadata(path_dst).is_ok() && decide(policy) == EnumConflictDecision::Keep {
        return Err(FsError::PolicyRejected(path_dst.to_path_buf()));
    }
    copy_file_atomically(path_src, path_dst, spec_fs_options.if_preserve_metadata)
}

/// Copy a directory tree into `dst`, merging with whatever is already there.
pub fn copy_dir<P, Q>(src: P, dst: Q, policy: &dyn ReplacePolicy) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let res = try_copy_dir(src, dst, policy, &SpecFsOptions::default());
    log_outcome("copy_dir", res).is_some()
}

/// Fallible [`copy_dir`]. A stopped copy becomes [`FsError::PartialFailure`].
pub fn try_copy_dir<P, Q>(
    src: P,
    dst: Q,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_dir_with_report(src, dst, policy, spec_fs_options)?.into_result()
}

/// Copy a directory tree and report what happened.
///
/// `Err` is returned only for rejections made before anything is touched:
/// blank input, a missing source, or a destination that equals or lies
/// inside the source. After that, the first failing entry (a kept conflict
/// included) stops the copy and is recorded in the report; entries already
/// copied stay in place.
pub fn copy_dir_with_report<P, Q>(
    src: P,
    dst: Q,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_src = resolve(src)?;
    let path_dst = resolve(dst)?;
    if !path_src.exists() {
        return Err(FsError::NotFound(path_src));
    }
    if !path_src.is_dir() {
        return Err(FsError::NotADirectory(path_src));
    }
    if path_dst.starts_with(&path_src) {
        return Err(FsError::SelfReference {
            path_src,
            path_dst,
        });
    }
    if path_dst.exists() && !path_dst.is_dir() {
        return Err(FsError::NotADirectory(path_dst));
    }

    let mut builder = ReportFsOpBuilder::default();
    if !path_dst.is_dir() {
        fs::create_dir_all(&path_dst).map_err(|e| FsError::io(&path_dst, e))?;
        builder.add_created();
    }

    let walk_entries = walk(&path_src, true, None)?;
    for res_entry in walk_entries {
        let spec_entry = match res_entry {
            Ok(v) => v,
            Err(e) => {
                builder.add_error(path_src.clone(), e.to_string());
                break;
            }
        };
        builder.add_scanned();
        if let Err(e) = copy_entry(&spec_entry, &path_src, &path_dst, policy, spec_fs_options, &mut builder)
        {
            if matches!(e, FsError::PolicyRejected(_)) {
                builder.add_kept();
            }
            builder.add_error(spec_entry.path.clone(), e.to_string());
            break;
        }
    }

    let report = builder.build();
    debug!(
        src = %path_src.display(),
        dst = %path_dst.display(),
        report = %report,
        "copy_dir finished"
    );
    Ok(report)
}

fn copy_entry(
    spec_entry: &SpecEntry,
    path_src_root: &Path,
    path_dst_root: &Path,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
    builder: &mut ReportFsOpBuilder,
) -> FsResult<()> {
    let path_rel = spec_entry
        .path
        .strip_prefix(path_src_root)
        .map_err(|_| FsError::InvalidPath(spec_entry.path.display().to_string()))?;
    let path_dst_entry = path_dst_root.join(path_rel);

    if spec_entry.if_is_symlink {
        if fs::symlink_metadata(&path_dst_entry).is_ok() {
            if decide(policy) == EnumConflictDecision::Keep {
                return Err(FsError::PolicyRejected(path_dst_entry));
            }
            remove_entry(&path_dst_entry)?;
        }
        create_symbolic_link(&spec_entry.path, &path_dst_entry)?;
        builder.add_copied();
        return Ok(());
    }

    if spec_entry.if_is_dir {
        if path_dst_entry.is_dir() {
            return Ok(());
        }
        if fs::symlink_metadata(&path_dst_entry).is_ok() {
            return Err(FsError::NotADirectory(path_dst_entry));
        }
        fs::create_dir(&path_dst_entry).map_err(|e| FsError::io(&path_dst_entry, e))?;
        builder.add_created();
        return Ok(());
    }

    let spec_outcome =
        copy_file_resolved(&spec_entry.path, &path_dst_entry, policy, spec_fs_options)?;
    for warning in spec_outcome.warnings {
        builder.add_warning(warning);
    }
    builder.add_copied();
    Ok(())
}

/// Copy `src` to `dst`, then delete `src`. Both steps must succeed.
pub fn move_file<P, Q>(src: P, dst: Q, policy: &dyn ReplacePolicy) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let res = try_move_file(src, dst, policy, &SpecFsOptions::default());
    log_outcome("move_file", res).is_some()
}

/// Fallible [`move_file`].
pub fn try_move_file<P, Q>(
    src: P,
    dst: Q,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_src = check_blank(src.as_ref())?;
    try_copy_file(path_src, dst, policy, spec_fs_options)?;
    // A symlinked source loses the link, never its target.
    fs::remove_file(path_src).map_err(|e| FsError::io(path_src, e))
}

/// Copy a directory tree to `dst`, then delete the source tree.
pub fn move_dir<P, Q>(src: P, dst: Q, policy: &dyn ReplacePolicy) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let res = try_move_dir(src, dst, policy, &SpecFsOptions::default());
    log_outcome("move_dir", res).is_some()
}

/// Fallible [`move_dir`].
pub fn try_move_dir<P, Q>(
    src: P,
    dst: Q,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    move_dir_with_report(src, dst, policy, spec_fs_options)?.into_result()
}

/// [`move_dir`] with a report. The source is only deleted once the copy
/// completed without errors; a symlinked source loses the link only.
pub fn move_dir_with_report<P, Q>(
    src: P,
    dst: Q,
    policy: &dyn ReplacePolicy,
    spec_fs_options: &SpecFsOptions,
) -> FsResult<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_src = check_blank(src.as_ref())?;
    let report_copy = copy_dir_with_report(path_src, dst, policy, spec_fs_options)?;
    if !report_copy.is_success() {
        return Ok(report_copy);
    }

    let mut builder = ReportFsOpBuilder::default();
    builder.merge(report_copy);
    let meta_src = fs::symlink_metadata(path_src).map_err(|e| FsError::io(path_src, e))?;
    if meta_src.file_type().is_symlink() {
        match remove_entry(path_src) {
            Ok(()) => builder.add_removed(),
            Err(e) => builder.add_error(path_src.to_path_buf(), e.to_string()),
        }
    } else {
        builder.merge(delete_dir_with_report(path_src)?);
    }
    Ok(builder.build())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Rename

/// Rename `path` within its own directory.
///
/// Succeeds without touching anything when `new_name` equals the current
/// name; fails when another entry already carries `new_name`.
pub fn rename<P: AsRef<Path>>(path: P, new_name: &str) -> bool {
    log_outcome("rename", try_rename(path, new_name)).is_some()
}

/// Fallible [`rename`]; returns the new path.
pub fn try_rename<P: AsRef<Path>>(path: P, new_name: &str) -> FsResult<PathBuf> {
    let path_old = check_blank(path.as_ref())?;
    if new_name.trim().is_empty() || new_name.contains(['/', '\\']) || new_name == ".." {
        return Err(FsError::InvalidPath(new_name.to_string()));
    }
    if fs::symlink_metadata(path_old).is_err() {
        return Err(FsError::NotFound(path_old.to_path_buf()));
    }

    let path_new = match path_old.parent() {
        Some(path_parent) => path_parent.join(new_name),
        None => PathBuf::from(new_name),
    };
    if path_old.file_name().is_some_and(|v| v == new_name) {
        return Ok(path_new);
    }
    if fs::symlink_metadata(&path_new).is_ok() {
        return Err(FsError::io(
            &path_new,
            io::Error::new(io::ErrorKind::AlreadyExists, "rename target exists"),
        ));
    }
    fs::rename(path_old, &path_new).map_err(|e| FsError::io(path_old, e))?;
    Ok(path_new)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Delete

/// Delete a single file. A path that does not exist counts as deleted;
/// a directory at `path` is a failure.
pub fn delete_file<P: AsRef<Path>>(path: P) -> bool {
    log_outcome("delete_file", try_delete_file(path)).is_some()
}

/// Fallible [`delete_file`].
pub fn try_delete_file<P: AsRef<Path>>(path: P) -> FsResult<()> {
    let path_file = check_blank(path.as_ref())?;
    let meta_entry = match fs::symlink_metadata(path_file) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(FsError::io(path_file, e)),
    };
    if meta_entry.is_dir() {
        return Err(FsError::NotAFile(path_file.to_path_buf()));
    }
    fs::remove_file(path_file).map_err(|e| FsError::io(path_file, e))
}

/// Delete a directory tree. A path that does not exist counts as deleted;
/// anything other than a directory at `path` is a failure.
pub fn delete_dir<P: AsRef<Path>>(path: P) -> bool {
    log_outcome("delete_dir", try_delete_dir(path)).is_some()
}

/// Fallible [`delete_dir`].
pub fn try_delete_dir<P: AsRef<Path>>(path: P) -> FsResult<ReportFsOp> {
    delete_dir_with_report(path)?.into_result()
}

/// [`delete_dir`] with a report of removed entries.
pub fn delete_dir_with_report<P: AsRef<Path>>(path: P) -> FsResult<ReportFsOp> {
    let path_dir = check_blank(path.as_ref())?;
    let Some(path_dir) = existing_dir(path_dir)? else {
        return Ok(ReportFsOp::default());
    };

    let mut builder = ReportFsOpBuilder::default();
    remove_children(path_dir, &mut builder)?;
    if builder.errors.is_empty() {
        match fs::remove_dir(path_dir) {
            Ok(()) => builder.add_removed(),
            Err(e) => builder.add_error(path_dir.to_path_buf(), FsError::io(path_dir, e).to_string()),
        }
    }
    Ok(builder.build())
}

/// Empty a directory, keeping the directory itself.
pub fn delete_all_in_dir<P: AsRef<Path>>(path: P) -> bool {
    log_outcome("delete_all_in_dir", try_delete_all_in_dir(path)).is_some()
}

/// Fallible [`delete_all_in_dir`].
pub fn try_delete_all_in_dir<P: AsRef<Path>>(path: P) -> FsResult<ReportFsOp> {
    let path_dir = check_blank(path.as_ref())?;
    let Some(path_dir) = existing_dir(path_dir)? else {
        return Ok(ReportFsOp::default());
    };
    let mut builder = ReportFsOpBuilder::default();
    remove_children(path_dir, &mut builder)?;
    builder.build().into_result()
}

/// Delete every file below `path`, leaving the directory structure in place.
pub fn delete_files_in_dir<P: AsRef<Path>>(path: P) -> bool {
    let res = try_delete_files_in_dir_with_filter(path, |_: &SpecEntry| true);
    log_outcome("delete_files_in_dir", res).is_some()
}

/// Delete every file below `path` accepted by `filter`.
pub fn delete_files_in_dir_with_filter<P, F>(path: P, filter: F) -> bool
where
    P: AsRef<Path>,
    F: Fn(&SpecEntry) -> bool,
{
    let res = try_delete_files_in_dir_with_filter(path, filter);
    log_outcome("delete_files_in_dir_with_filter", res).is_some()
}

/// Fallible [`delete_files_in_dir_with_filter`].
pub fn try_delete_files_in_dir_with_filter<P, F>(path: P, filter: F) -> FsResult<ReportFsOp>
where
    P: AsRef<Path>,
    F: Fn(&SpecEntry) -> bool,
{
    let path_dir = check_blank(path.as_ref())?;
    let Some(path_dir) = existing_dir(path_dir)? else {
        return Ok(ReportFsOp::default());
    };

    let filter_files: TypeEntryFilter<'_> =
        Box::new(move |spec_entry: &SpecEntry| !spec_entry.if_is_dir && filter(spec_entry));
    let mut builder = ReportFsOpBuilder::default();
    for res_entry in walk(path_dir, true, Some(filter_files))? {
        let spec_entry = match res_entry {
            Ok(v) => v,
            Err(e) => {
                builder.add_error(path_dir.to_path_buf(), e.to_string());
                break;
            }
        };
        builder.add_scanned();
        match fs::remove_file(&spec_entry.path) {
            Ok(()) => builder.add_removed(),
            Err(e) => {
                builder.add_error(
                    spec_entry.path.clone(),
                    FsError::io(&spec_entry.path, e).to_string(),
                );
                break;
            }
        }
    }
    builder.build().into_result()
}

// `None` when nothing exists at `path_dir`; a symlink is not a directory here.
fn existing_dir(path_dir: &Path) -> FsResult<Option<&Path>> {
    match fs::symlink_metadata(path_dir) {
        Ok(v) if v.is_dir() => Ok(Some(path_dir)),
        Ok(_) => Err(FsError::NotADirectory(path_dir.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FsError::io(path_dir, e)),
    }
}

fn remove_children(path_dir: &Path, builder: &mut ReportFsOpBuilder) -> FsResult<()> {
    for res_entry in walk(path_dir, false, None)? {
        let spec_entry = match res_entry {
            Ok(v) => v,
            Err(e) => {
                builder.add_error(path_dir.to_path_buf(), e.to_string());
                return Ok(());
            }
        };
        builder.add_scanned();
        if let Err(e) = remove_entry(&spec_entry.path) {
            builder.add_error(spec_entry.path.clone(), e.to_string());
            return Ok(());
        }
        builder.add_removed();
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
