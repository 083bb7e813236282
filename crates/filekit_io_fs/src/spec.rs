//! Filesystem operation models, options and top-level error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Text encoding guessed from a file prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumCharset {
    /// UTF-8, with or without BOM. Plain ASCII also lands here.
    Utf8,
    /// UTF-16 little-endian (`FF FE` BOM).
    Utf16Le,
    /// UTF-16 big-endian (`FE FF` BOM).
    Utf16Be,
    /// GBK. Fallback for anything the heuristic cannot place.
    Gbk,
}

impl EnumCharset {
    /// Exact label expected by callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Gbk => "GBK",
        }
    }
}

impl fmt::Display for EnumCharset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to one destination conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumConflictDecision {
    /// Remove the existing destination entry and write the source over it.
    Replace,
    /// Leave the destination untouched; the copy of this entry fails.
    #[default]
    Keep,
}

impl EnumConflictDecision {
    /// Map a boolean policy answer onto a decision.
    pub fn from_should_replace(b_should_replace: bool) -> Self {
        if b_should_replace {
            Self::Replace
        } else {
            Self::Keep
        }
    }
}

/// Pattern matching mode for include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndOptions

/// One node discovered by the tree walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntry {
    /// Path of the entry, rooted at the walked directory.
    pub path: PathBuf,
    /// Whether the entry is (or links to) a directory.
    pub if_is_dir: bool,
    /// Whether the entry itself is a symbolic link.
    pub if_is_symlink: bool,
    /// Byte length for files, `0` for directories.
    pub size_bytes: u64,
    /// Last modification time, `UNIX_EPOCH` when the platform cannot report it.
    pub time_modified: SystemTime,
    /// Distance from the walk root; immediate children have depth `1`.
    pub depth: usize,
}

impl SpecEntry {
    /// Basename of the entry.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Options shared by the mutating and size operations.
#[derive(Debug, Clone)]
pub struct SpecFsOptions {
    /// Conflict answer used when the caller supplies no policy.
    pub rule_conflict_default: EnumConflictDecision,
    /// Carry timestamps (and xattrs on Linux) over to copied files.
    pub if_preserve_metadata: bool,
    /// Maximum worker threads for size summation.
    pub num_workers_max: Option<usize>,
    /// Connect/read timeout for the remote `HEAD` request.
    pub duration_remote_timeout: Duration,
    /// Number of leading bytes inspected by the charset sniffer.
    pub n_sniff_prefix_len: usize,
}

impl Default for SpecFsOptions {
    fn default() -> Self {
        Self {
            rule_conflict_default: EnumConflictDecision::Keep,
            if_preserve_metadata: true,
            num_workers_max: None,
            duration_remote_timeout: Duration::from_secs(5),
            n_sniff_prefix_len: crate::charset::N_SNIFF_PREFIX_LEN,
        }
    }
}

/// Input options for [`crate::walk::walk_with_options`].
#[derive(Debug, Clone)]
pub struct SpecWalkOptions {
    /// Descend into subdirectories.
    pub if_recursive: bool,
    /// Include patterns applied to entry basename.
    pub patterns_include: Option<Vec<String>>,
    /// Exclude patterns applied to entry basename.
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
    /// Report directory entries as well as files.
    pub if_include_dirs: bool,
    /// Optional maximum depth; entries deeper than this are neither yielded nor descended.
    pub depth_limit: Option<usize>,
}

impl Default for SpecWalkOptions {
    fn default() -> Self {
        Self {
            if_recursive: true,
            patterns_include: None,
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
            if_include_dirs: true,
            depth_limit: None,
        }
    }
}

/// One path-scoped failure recorded by a composite operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFsOpError {
    /// Entry being processed when the failure happened.
    pub path: PathBuf,
    /// Failure text.
    pub exception: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failure taxonomy for every operation in this crate.
///
/// The boolean entry points collapse all variants into `false`; the `try_*`
/// entry points hand them back unchanged.
#[derive(Debug, Error)]
pub enum FsError {
    /// Empty or whitespace-only path input.
    #[error("Invalid path: `{0}`")]
    InvalidPath(String),
    /// Include/exclude pattern failed to compile.
    #[error("Invalid pattern in include/exclude: {0}")]
    InvalidPattern(String),
    /// Source path does not exist.
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Path exists but is not a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// Path exists but is not a regular file.
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
    /// Destination exists and the conflict policy kept it.
    #[error("Destination exists and was kept: {}", .0.display())]
    PolicyRejected(PathBuf),
    /// Destination equals the source or lies inside it.
    #[error(
        "Source and destination overlap: {} <-> {}",
        .path_src.display(),
        .path_dst.display()
    )]
    SelfReference {
        /// Resolved source path.
        path_src: PathBuf,
        /// Resolved destination path.
        path_dst: PathBuf,
    },
    /// Underlying read/write/permission fault.
    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        /// Path being touched when the fault happened.
        path: PathBuf,
        /// OS-level error.
        #[source]
        source: io::Error,
    },
    /// Composite operation stopped after some sub-steps already succeeded.
    #[error(
        "Operation stopped at {} after {n_done} completed entries: {message}",
        .path.display()
    )]
    PartialFailure {
        /// Entry that failed.
        path: PathBuf,
        /// Entries completed before the failure.
        n_done: u64,
        /// Failure text of the failing entry.
        message: String,
    },
}

impl FsError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this is a validation outcome rather than an OS-level fault.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::PartialFailure { .. })
    }
}

/// Result alias used across the crate.
pub type FsResult<T> = Result<T, FsError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
