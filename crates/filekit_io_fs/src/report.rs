//! Composite operation report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::{FsError, FsResult, SpecFsOpError};

/// Aggregate counters and diagnostics for one composite operation
/// (`copy_dir`, `move_dir`, `delete_dir` and the `delete_*_in_dir` family).
#[derive(Debug, Default, Clone)]
pub struct ReportFsOp {
    /// Entries visited under the source root.
    pub cnt_scanned: u64,
    /// Directories created at the destination.
    pub cnt_created: u64,
    /// Files and symlinks written at the destination.
    pub cnt_copied: u64,
    /// Entries removed.
    pub cnt_removed: u64,
    /// Conflicts the policy answered with keep.
    pub cnt_kept: u64,
    /// Non-fatal warnings collected along the way.
    pub warnings: Vec<String>,
    /// Failures; the operation stops at the first one.
    pub errors: Vec<SpecFsOpError>,
}

impl ReportFsOp {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Whether the whole operation completed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Entries completed before the operation stopped.
    pub fn cnt_done(&self) -> u64 {
        self.cnt_created + self.cnt_copied + self.cnt_removed
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_created".to_string(), self.cnt_created);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_removed".to_string(), self.cnt_removed);
        dict_counts.insert("cnt_kept".to_string(), self.cnt_kept);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} created={} copied={} removed={} kept={} errors={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_created"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_removed"],
            dict_counts["cnt_kept"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }

    /// Turn a report with errors into [`FsError::PartialFailure`] naming the
    /// first failing entry.
    pub fn into_result(self) -> FsResult<Self> {
        let Some(spec_error) = self.errors.first() else {
            return Ok(self);
        };
        Err(FsError::PartialFailure {
            path: spec_error.path.clone(),
            n_done: self.cnt_done(),
            message: spec_error.exception.clone(),
        })
    }
}

impl fmt::Display for ReportFsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[FS]"))
    }
}

/// Mutable accumulator for composite operation statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportFsOpBuilder {
    /// See [`ReportFsOp::cnt_scanned`].
    pub cnt_scanned: u64,
    /// See [`ReportFsOp::cnt_created`].
    pub cnt_created: u64,
    /// See [`ReportFsOp::cnt_copied`].
    pub cnt_copied: u64,
    /// See [`ReportFsOp::cnt_removed`].
    pub cnt_removed: u64,
    /// See [`ReportFsOp::cnt_kept`].
    pub cnt_kept: u64,
    /// See [`ReportFsOp::errors`].
    pub errors: Vec<SpecFsOpError>,
    /// See [`ReportFsOp::warnings`].
    pub warnings: Vec<String>,
}

impl ReportFsOpBuilder {
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub fn add_created(&mut self) {
        self.cnt_created += 1;
    }

    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    pub fn add_removed(&mut self) {
        self.cnt_removed += 1;
    }

    pub fn add_kept(&mut self) {
        self.cnt_kept += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        self.errors.push(SpecFsOpError { path, exception });
    }

    /// Fold another report's counters into this builder (used by `move_dir`).
    pub fn merge(&mut self, report: ReportFsOp) {
        self.cnt_scanned += report.cnt_scanned;
        self.cnt_created += report.cnt_created;
        self.cnt_copied += report.cnt_copied;
        self.cnt_removed += report.cnt_removed;
        self.cnt_kept += report.cnt_kept;
        self.warnings.extend(report.warnings);
        self.errors.extend(report.errors);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportFsOp {
        ReportFsOp {
            cnt_scanned: self.cnt_scanned,
            cnt_created: self.cnt_created,
            cnt_copied: self.cnt_copied,
            cnt_removed: self.cnt_removed,
            cnt_kept: self.cnt_kept,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}
