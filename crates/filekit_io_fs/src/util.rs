use std::fs;
use std::io;
use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use tracing::{debug, warn};

use crate::spec::{EnumPatternMode, FsError, FsResult};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypePatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SpecEntryPatterns {
    pub(crate) patterns_include: Option<TypePatternSeq>,
    pub(crate) patterns_exclude: Option<TypePatternSeq>,
}

impl SpecEntryPatterns {
    pub(crate) fn from_raw(
        patterns_include: Option<&[String]>,
        patterns_exclude: Option<&[String]>,
        rule_pattern: EnumPatternMode,
    ) -> FsResult<Self> {
        Ok(Self {
            patterns_include: _compile(patterns_include, rule_pattern)?,
            patterns_exclude: _compile(patterns_exclude, rule_pattern)?,
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.patterns_include.is_none() && self.patterns_exclude.is_none()
    }

    pub(crate) fn should_exclude(&self, value: &str) -> bool {
        let b_included = self
            .patterns_include
            .as_ref()
            .is_none_or(|p| p.is_match(value));
        let b_excluded = self
            .patterns_exclude
            .as_ref()
            .is_some_and(|p| p.is_match(value));
        !b_included || b_excluded
    }
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumPatternMode,
) -> FsResult<Option<TypePatternSeq>> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumPatternMode::Literal => Ok(Some(TypePatternSeq::Literal(patterns.to_vec()))),
        EnumPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| FsError::InvalidPattern(e.to_string()))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypePatternSeq::Glob(l_glob)))
        }
        EnumPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern).map_err(|e| FsError::InvalidPattern(e.to_string()))?;
                l_regex.push(regex);
            }
            Ok(Some(TypePatternSeq::Regex(l_regex)))
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CopyPrimitives

/// Bytes written by one file copy and the metadata steps that did not stick.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpecCopyOutcome {
    pub(crate) n_bytes: u64,
    pub(crate) warnings: Vec<String>,
}

/// Stream `path_file_src` into a temporary sibling of `path_file_dst`, then
/// rename it into place. A failure at any step leaves `path_file_dst` as it was.
pub(crate) fn copy_file_atomically(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> FsResult<SpecCopyOutcome> {
    let path_dir_parent = path_file_dst
        .parent()
        .ok_or_else(|| FsError::InvalidPath(path_file_dst.display().to_string()))?;

    let mut file_src = fs::File::open(path_file_src).map_err(|e| FsError::io(path_file_src, e))?;
    let mut file_tmp = tempfile::Builder::new()
        .prefix(".filekit_")
        .suffix(".part")
        .tempfile_in(path_dir_parent)
        .map_err(|e| FsError::io(path_dir_parent, e))?;

    let n_bytes =
        io::copy(&mut file_src, file_tmp.as_file_mut()).map_err(|e| FsError::io(path_file_src, e))?;
    file_tmp
        .as_file()
        .sync_all()
        .map_err(|e| FsError::io(file_tmp.path(), e))?;

    let stat_src = fs::metadata(path_file_src).map_err(|e| FsError::io(path_file_src, e))?;
    fs::set_permissions(file_tmp.path(), stat_src.permissions())
        .map_err(|e| FsError::io(file_tmp.path(), e))?;
    let mut warnings = Vec::new();
    if if_preserve_metadata {
        warnings = apply_metadata(path_file_src, &stat_src, file_tmp.path())
            .map_err(|e| FsError::io(path_file_dst, e))?;
    }

    file_tmp
        .persist(path_file_dst)
        .map_err(|e| FsError::io(path_file_dst, e.error))?;
    for warning in &warnings {
        warn!(dst = %path_file_dst.display(), "{warning}");
    }
    Ok(SpecCopyOutcome { n_bytes, warnings })
}

fn apply_metadata(
    path_file_src: &Path,
    stat_src: &fs::Metadata,
    path_file_dst: &Path,
) -> Result<Vec<String>, io::Error> {
    use filetime::{FileTime, set_file_times};

    let file_time_access = FileTime::from_last_access_time(stat_src);
    let file_time_modify = FileTime::from_last_modification_time(stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    let warnings = copy_xattrs_linux(path_file_src, path_file_dst);
    #[cfg(not(target_os = "linux"))]
    let warnings = {
        let _ = path_file_src;
        Vec::new()
    };
    Ok(warnings)
}

// Filesystems without xattr support are skipped silently.
#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) -> Vec<String> {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::Unsupported => return Vec::new(),
        Err(e) => {
            return vec![format!(
                "Failed to list xattrs of {}: {e}",
                path_file_src.display()
            )];
        }
    };

    let mut warnings = Vec::new();
    for name in iter_xattr_names {
        let c_name = name.to_string_lossy();
        let raw_value = match xattr::get(path_file_src, &name) {
            Ok(Some(v)) => v,
            Ok(None) => continue,
            Err(e) => {
                warnings.push(format!("Failed to read xattr `{c_name}`: {e}"));
                continue;
            }
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            warnings.push(format!("Failed to set xattr `{c_name}`: {e}"));
        }
    }
    warnings
}

/// Recreate the symlink at `path_src` as a new symlink at `path_dst`.
pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> FsResult<()> {
    let target = fs::read_link(path_src).map_err(|e| FsError::io(path_src, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;
        symlink(&target, path_dst).map_err(|e| FsError::io(path_dst, e))
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        let res = if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        };
        res.map_err(|e| FsError::io(path_dst, e))
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(FsError::io(
            path_dst,
            io::Error::new(
                io::ErrorKind::Unsupported,
                "Symbolic links are unsupported on this platform",
            ),
        ))
    }
}

/// Remove whatever occupies `path` without following a final symlink.
pub(crate) fn remove_entry(path: &Path) -> FsResult<()> {
    let meta_entry = match fs::symlink_metadata(path) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(FsError::io(path, e)),
    };
    let res_remove = if meta_entry.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    res_remove.map_err(|e| FsError::io(path, e))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Runtime

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

/// Collapse an operation result into the boolean contract, logging the failure.
pub(crate) fn log_outcome<T>(c_op: &str, res: FsResult<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) if e.is_expected() => {
            debug!(op = c_op, error = %e, "operation rejected");
            None
        }
        Err(e) => {
            warn!(op = c_op, error = %e, "operation failed");
            None
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    #[cfg(target_os = "linux")]
    use super::copy_xattrs_linux;
    use super::{SpecEntryPatterns, calculate_worker_limit, copy_file_atomically, remove_entry};
    use crate::spec::{EnumPatternMode, FsError};

    fn to_vec(l_raw: &[&str]) -> Vec<String> {
        l_raw.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn patterns_include_and_exclude_by_mode() {
        let l_inc = to_vec(&["*.txt"]);
        let spec_pats =
            SpecEntryPatterns::from_raw(Some(l_inc.as_slice()), None, EnumPatternMode::Glob).expect("glob");
        assert!(!spec_pats.should_exclude("a.txt"));
        assert!(spec_pats.should_exclude("a.md"));

        let l_inc = to_vec(&[r"^report_\d+\.csv$"]);
        let l_exc = to_vec(&[r"_02\."]);
        let spec_pats =
            SpecEntryPatterns::from_raw(Some(l_inc.as_slice()), Some(l_exc.as_slice()), EnumPatternMode::Regex)
                .expect("regex");
        assert!(!spec_pats.should_exclude("report_01.csv"));
        assert!(spec_pats.should_exclude("report_02.csv"));

        let l_exc = to_vec(&["8.txt"]);
        let spec_pats =
            SpecEntryPatterns::from_raw(None, Some(l_exc.as_slice()), EnumPatternMode::Literal)
                .expect("literal");
        assert!(spec_pats.should_exclude("UTF8.txt"));
        assert!(!spec_pats.should_exclude("GBK.txt"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        let l_bad = to_vec(&["("]);
        let err = SpecEntryPatterns::from_raw(Some(l_bad.as_slice()), None, EnumPatternMode::Regex)
            .expect_err("invalid regex must fail");
        assert!(matches!(err, FsError::InvalidPattern(_)));

        let l_bad = to_vec(&["["]);
        let err = SpecEntryPatterns::from_raw(Some(l_bad.as_slice()), None, EnumPatternMode::Glob)
            .expect_err("invalid glob must fail");
        assert!(matches!(err, FsError::InvalidPattern(_)));
    }

    #[test]
    fn empty_pattern_lists_mean_no_filter() {
        let spec_pats = SpecEntryPatterns::from_raw(Some(&[][..]), None, EnumPatternMode::Glob)
            .expect("empty list");
        assert!(spec_pats.is_empty());
        assert!(!spec_pats.should_exclude("anything"));
    }

    #[test]
    fn atomic_copy_replaces_destination_and_leaves_no_temp() {
        let tmp = TempDir::new().expect("tempdir");
        let path_src = tmp.path().join("src.txt");
        let path_dst = tmp.path().join("dst.txt");
        std::fs::write(&path_src, b"fresh bytes").expect("write src");
        std::fs::write(&path_dst, b"old").expect("write dst");

        let spec_outcome = copy_file_atomically(&path_src, &path_dst, true).expect("copy");
        assert_eq!(spec_outcome.n_bytes, 11);
        assert_eq!(std::fs::read(&path_dst).expect("read"), b"fresh bytes");

        let n_leftover = std::fs::read_dir(tmp.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count();
        assert_eq!(n_leftover, 0);
    }

    #[test]
    fn atomic_copy_of_missing_source_keeps_destination() {
        let tmp = TempDir::new().expect("tempdir");
        let path_dst = tmp.path().join("dst.txt");
        std::fs::write(&path_dst, b"old").expect("write dst");

        let err = copy_file_atomically(&tmp.path().join("missing"), &path_dst, false)
            .expect_err("missing source");
        assert!(matches!(err, FsError::Io { .. }));
        assert_eq!(std::fs::read(&path_dst).expect("read"), b"old");
    }

    #[test]
    fn remove_entry_handles_files_dirs_and_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let path_dir = tmp.path().join("d/e");
        std::fs::create_dir_all(&path_dir).expect("mkdir");
        std::fs::write(path_dir.join("f"), b"x").expect("write");

        remove_entry(&tmp.path().join("d")).expect("remove dir");
        assert!(!tmp.path().join("d").exists());
        remove_entry(&tmp.path().join("d")).expect("missing is fine");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn xattr_copy_failures_become_warnings() {
        let tmp = TempDir::new().expect("tempdir");
        let path_src = tmp.path().join("src.txt");
        std::fs::write(&path_src, b"x").expect("write src");
        if xattr::set(&path_src, "user.filekit", b"1").is_err() {
            return;
        }

        let warnings = copy_xattrs_linux(&path_src, &tmp.path().join("missing.txt"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("user.filekit"));

        let path_dst = tmp.path().join("dst.txt");
        let spec_outcome = copy_file_atomically(&path_src, &path_dst, true).expect("copy");
        assert!(spec_outcome.warnings.is_empty());
        assert_eq!(
            xattr::get(&path_dst, "user.filekit").expect("get xattr"),
            Some(b"1".to_vec())
        );
    }

    #[test]
    fn worker_limit_is_at_least_one() {
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        assert!(calculate_worker_limit(None) >= 1);
    }
}
