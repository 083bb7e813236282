//! `filekit_io_fs` v1:
//! Filesystem utility layer.
//!
//! Modules:
//! - `path`    : path resolution and name helpers
//! - `policy`  : conflict policy consulted before overwriting
//! - `charset` : byte-prefix charset sniffing
//! - `walk`    : lazy pre-order directory traversal
//! - `size`    : file/directory/remote size aggregation
//! - `remote`  : `HEAD` request for remote content length
//! - `ops`     : create/copy/move/rename/delete
//! - `info`    : single-file queries (timestamps, lines, MD5)
//! - `spec`    : enums/options/errors
//! - `report`  : composite operation report model
//! - `util`    : shared helper functions

pub mod charset;
pub mod info;
pub mod ops;
pub mod path;
pub mod policy;
pub mod remote;
pub mod report;
pub mod size;
pub mod spec;
mod util;
pub mod walk;

pub use charset::{
    N_SNIFF_PREFIX_LEN, sniff, sniff_bytes, sniff_prefix_bytes, sniff_with, sniff_with_limit,
};
pub use info::{
    file_last_modified, file_last_modified_string, file_lines, file_md5, file_md5_to_string,
    is_dir, is_file, is_file_exists, try_file_last_modified, try_file_lines, try_file_md5,
};
pub use ops::{
    copy_dir, copy_dir_with_report, copy_file, create_file_by_delete_old_file,
    create_or_exists_dir, create_or_exists_file, delete_all_in_dir, delete_dir,
    delete_dir_with_report, delete_file, delete_files_in_dir, delete_files_in_dir_with_filter,
    move_dir, move_dir_with_report, move_file, rename, try_copy_dir, try_copy_file,
    try_create_file_by_delete_old_file, try_create_or_exists_dir, try_create_or_exists_file,
    try_delete_all_in_dir, try_delete_dir, try_delete_file, try_delete_files_in_dir_with_filter,
    try_move_dir, try_move_file, try_rename,
};
pub use path::{
    dir_name, file_extension, file_name, file_name_no_extension, is_nested_or_same, is_same_path,
    resolve,
};
pub use policy::{AlwaysReplace, NeverReplace, ReplacePolicy};
pub use remote::{is_remote_reference, head_content_length};
pub use report::{ReportFsOp, ReportFsOpBuilder};
pub use size::{
    dir_length, dir_size, dir_size_string, file_length, file_length_with, file_size_string,
    format_fit_memory_size, size_of, try_dir_length, try_dir_size, try_file_length,
};
pub use spec::{
    EnumCharset, EnumConflictDecision, EnumPatternMode, FsError, FsResult, SpecEntry,
    SpecFsOpError, SpecFsOptions, SpecWalkOptions,
};
pub use walk::{
    TypeEntryFilter, WalkEntries, list_files_in_dir, list_files_in_dir_with_filter, walk,
    walk_with_options,
};
