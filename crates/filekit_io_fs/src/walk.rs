//! Lazy, restartable directory enumeration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::spec::{FsError, FsResult, SpecEntry, SpecWalkOptions};
use crate::util::{SpecEntryPatterns, log_outcome};

/// Inclusion predicate applied to candidate entries.
pub type TypeEntryFilter<'a> = Box<dyn Fn(&SpecEntry) -> bool + 'a>;

#[derive(Debug)]
struct SpecWalkFrame {
    iter_children: std::vec::IntoIter<fs::DirEntry>,
    depth: usize,
}

/// Pre-order sequence of [`SpecEntry`] values under one root.
///
/// Directories are read one at a time as the iterator advances; siblings are
/// produced in file-name order and a directory is always produced before its
/// children. The filter only decides what is yielded: rejected directories
/// are still descended. The first I/O error is yielded as `Err` and ends the
/// sequence.
pub struct WalkEntries<'a> {
    path_root: PathBuf,
    if_recursive: bool,
    depth_limit: Option<usize>,
    filter: Option<TypeEntryFilter<'a>>,
    l_frames: Vec<SpecWalkFrame>,
    pending_descent: Option<(PathBuf, usize)>,
    if_finished: bool,
}

impl std::fmt::Debug for WalkEntries<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkEntries")
            .field("path_root", &self.path_root)
            .field("if_recursive", &self.if_recursive)
            .field("depth_limit", &self.depth_limit)
            .field("if_filtered", &self.filter.is_some())
            .field("if_finished", &self.if_finished)
            .finish()
    }
}

/// Walk `root`, yielding immediate children only unless `recursive` is set.
///
/// Fails with [`FsError::NotFound`] when `root` is missing and with
/// [`FsError::NotADirectory`] when it is something else.
pub fn walk<'a, P: AsRef<Path>>(
    root: P,
    recursive: bool,
    filter: Option<TypeEntryFilter<'a>>,
) -> FsResult<WalkEntries<'a>> {
    let path_root = root.as_ref().to_path_buf();
    if !path_root.exists() {
        return Err(FsError::NotFound(path_root));
    }
    if !path_root.is_dir() {
        return Err(FsError::NotADirectory(path_root));
    }

    let mut walk_entries = WalkEntries {
        path_root,
        if_recursive: recursive,
        depth_limit: None,
        filter,
        l_frames: Vec::new(),
        pending_descent: None,
        if_finished: false,
    };
    walk_entries.restart()?;
    Ok(walk_entries)
}

/// Walk `root` with pattern, depth and directory-inclusion options.
pub fn walk_with_options<P: AsRef<Path>>(
    root: P,
    spec_walk_options: &SpecWalkOptions,
) -> FsResult<WalkEntries<'static>> {
    let spec_pats = SpecEntryPatterns::from_raw(
        spec_walk_options.patterns_include.as_deref(),
        spec_walk_options.patterns_exclude.as_deref(),
        spec_walk_options.rule_pattern,
    )?;
    let if_include_dirs = spec_walk_options.if_include_dirs;

    let filter: Option<TypeEntryFilter<'static>> = if spec_pats.is_empty() && if_include_dirs {
        None
    } else {
        Some(Box::new(move |spec_entry: &SpecEntry| {
            if spec_entry.if_is_dir && !if_include_dirs {
                return false;
            }
            !spec_pats.should_exclude(&spec_entry.name())
        }))
    };

    let mut walk_entries = walk(root, spec_walk_options.if_recursive, filter)?;
    walk_entries.depth_limit = spec_walk_options.depth_limit;
    Ok(walk_entries)
}

impl WalkEntries<'_> {
    /// Root this walker enumerates.
    pub fn root(&self) -> &Path {
        &self.path_root
    }

    /// Rewind to the beginning, re-reading the root directory.
    pub fn restart(&mut self) -> FsResult<()> {
        self.l_frames.clear();
        self.pending_descent = None;
        self.if_finished = false;
        let spec_frame = open_frame(&self.path_root, 1)?;
        self.l_frames.push(spec_frame);
        Ok(())
    }

    fn should_descend(&self, spec_entry: &SpecEntry) -> bool {
        self.if_recursive
            && spec_entry.if_is_dir
            && !spec_entry.if_is_symlink
            && self.depth_limit.is_none_or(|n| spec_entry.depth < n)
    }

    fn fail(&mut self, err: FsError) -> Option<FsResult<SpecEntry>> {
        self.if_finished = true;
        self.l_frames.clear();
        self.pending_descent = None;
        Some(Err(err))
    }
}

impl Iterator for WalkEntries<'_> {
    type Item = FsResult<SpecEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.if_finished {
                return None;
            }

            if let Some((path_dir, n_depth)) = self.pending_descent.take() {
                match open_frame(&path_dir, n_depth) {
                    Ok(spec_frame) => self.l_frames.push(spec_frame),
                    Err(e) => return self.fail(e),
                }
            }

            let Some(spec_frame) = self.l_frames.last_mut() else {
                self.if_finished = true;
                return None;
            };
            let n_depth = spec_frame.depth;
            let Some(dir_entry) = spec_frame.iter_children.next() else {
                self.l_frames.pop();
                continue;
            };

            let spec_entry = match build_entry(&dir_entry, n_depth) {
                Ok(v) => v,
                Err(e) => return self.fail(e),
            };
            if self.depth_limit.is_some_and(|n| n_depth > n) {
                continue;
            }
            if self.should_descend(&spec_entry) {
                self.pending_descent = Some((spec_entry.path.clone(), n_depth + 1));
            }
            if let Some(filter) = &self.filter
                && !filter(&spec_entry)
            {
                continue;
            }
            return Some(Ok(spec_entry));
        }
    }
}

fn open_frame(path_dir: &Path, depth: usize) -> FsResult<SpecWalkFrame> {
    let mut l_children = fs::read_dir(path_dir)
        .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
        .map_err(|e| FsError::io(path_dir, e))?;
    l_children.sort_by_key(|v| v.file_name());
    Ok(SpecWalkFrame {
        iter_children: l_children.into_iter(),
        depth,
    })
}

fn build_entry(dir_entry: &fs::DirEntry, depth: usize) -> FsResult<SpecEntry> {
    let path_entry = dir_entry.path();
    let cfg_file_type = dir_entry
        .file_type()
        .map_err(|e| FsError::io(&path_entry, e))?;
    let if_is_symlink = cfg_file_type.is_symlink();

    // Broken links fall back to the link's own metadata.
    let meta_entry = if if_is_symlink {
        fs::metadata(&path_entry).or_else(|_| fs::symlink_metadata(&path_entry))
    } else {
        dir_entry.metadata()
    }
    .map_err(|e| FsError::io(&path_entry, e))?;

    let if_is_dir = meta_entry.is_dir();
    Ok(SpecEntry {
        path: path_entry,
        if_is_dir,
        if_is_symlink,
        size_bytes: if if_is_dir { 0 } else { meta_entry.len() },
        time_modified: meta_entry.modified().unwrap_or(UNIX_EPOCH),
        depth,
    })
}

/// Collect the entries under `root`; `None` when the walk fails.
pub fn list_files_in_dir<P: AsRef<Path>>(root: P, recursive: bool) -> Option<Vec<SpecEntry>> {
    let res_entries =
        walk(root, recursive, None).and_then(|walk_entries| walk_entries.collect::<FsResult<_>>());
    log_outcome("list_files_in_dir", res_entries)
}

/// Collect the entries under `root` accepted by `filter`; `None` when the walk fails.
pub fn list_files_in_dir_with_filter<P, F>(
    root: P,
    filter: F,
    recursive: bool,
) -> Option<Vec<SpecEntry>>
where
    P: AsRef<Path>,
    F: Fn(&SpecEntry) -> bool,
{
    let res_entries = walk(root, recursive, Some(Box::new(filter)))
        .and_then(|walk_entries| walk_entries.collect::<FsResult<_>>());
    log_outcome("list_files_in_dir_with_filter", res_entries)
}
