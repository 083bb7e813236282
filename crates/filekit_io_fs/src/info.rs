//! Read-only queries about single files.

use std::fs;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Local};
use md5::{Digest, Md5};

use crate::spec::{FsError, FsResult};
use crate::util::log_outcome;

/// Pattern used by [`file_last_modified_string`] when none is given.
pub const C_TIME_PATTERN_DEFAULT: &str = "%Y-%m-%d %H:%M:%S";

////////////////////////////////////////////////////////////////////////////////
// #region Predicates

/// Whether anything exists at `path` (symlinks are followed).
pub fn is_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists()
}

pub fn is_dir<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_dir()
}

pub fn is_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_file()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Timestamps

/// Last modification time in milliseconds since the Unix epoch; `0` on failure.
pub fn file_last_modified<P: AsRef<Path>>(path: P) -> u64 {
    log_outcome("file_last_modified", try_file_last_modified(path)).unwrap_or(0)
}

/// Fallible [`file_last_modified`].
pub fn try_file_last_modified<P: AsRef<Path>>(path: P) -> FsResult<u64> {
    let path_file = path.as_ref();
    let time_modified = fs::metadata(path_file)
        .and_then(|v| v.modified())
        .map_err(|e| FsError::io(path_file, e))?;
    let n_ms = time_modified
        .duration_since(UNIX_EPOCH)
        .map(|v| v.as_millis() as u64)
        .unwrap_or(0);
    Ok(n_ms)
}

/// Local-time rendering of the last modification time using a `chrono`
/// format pattern ([`C_TIME_PATTERN_DEFAULT`] when `pattern` is `None`).
///
/// Returns `""` when the time cannot be read.
pub fn file_last_modified_string<P: AsRef<Path>>(path: P, pattern: Option<&str>) -> String {
    let path_file = path.as_ref();
    let res_time = fs::metadata(path_file)
        .and_then(|v| v.modified())
        .map_err(|e| FsError::io(path_file, e));
    let Some(time_modified) = log_outcome("file_last_modified_string", res_time) else {
        return String::new();
    };
    let datetime: DateTime<Local> = time_modified.into();
    datetime
        .format(pattern.unwrap_or(C_TIME_PATTERN_DEFAULT))
        .to_string()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Content

/// Number of lines in the file; `0` for empty or unreadable files.
pub fn file_lines<P: AsRef<Path>>(path: P) -> usize {
    log_outcome("file_lines", try_file_lines(path)).unwrap_or(0)
}

/// Count `\n`-terminated lines plus a trailing unterminated one.
pub fn try_file_lines<P: AsRef<Path>>(path: P) -> FsResult<usize> {
    let path_file = path.as_ref();
    let file = open_regular_file(path_file)?;
    let mut reader = BufReader::new(file);

    let mut raw_buf = [0_u8; 8192];
    let mut n_lines = 0_usize;
    let mut byte_last: Option<u8> = None;
    loop {
        let n_read = match reader.read(&mut raw_buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsError::io(path_file, e)),
        };
        n_lines += raw_buf[..n_read].iter().filter(|&&b| b == b'\n').count();
        byte_last = Some(raw_buf[n_read - 1]);
    }

    match byte_last {
        Some(b'\n') | None => Ok(n_lines),
        Some(_) => Ok(n_lines + 1),
    }
}

/// MD5 digest of the file content, `None` on failure.
pub fn file_md5<P: AsRef<Path>>(path: P) -> Option<[u8; 16]> {
    log_outcome("file_md5", try_file_md5(path))
}

/// Fallible [`file_md5`].
pub fn try_file_md5<P: AsRef<Path>>(path: P) -> FsResult<[u8; 16]> {
    let path_file = path.as_ref();
    let mut file = open_regular_file(path_file)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher).map_err(|e| FsError::io(path_file, e))?;
    let mut raw_digest = [0_u8; 16];
    raw_digest.copy_from_slice(&hasher.finalize());
    Ok(raw_digest)
}

/// Uppercase hex MD5 of the file content, `""` on failure.
pub fn file_md5_to_string<P: AsRef<Path>>(path: P) -> String {
    file_md5(path).map(|v| to_hex_upper(&v)).unwrap_or_default()
}

fn to_hex_upper(raw: &[u8]) -> String {
    const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut c_hex = String::with_capacity(raw.len() * 2);
    for &b in raw {
        c_hex.push(HEX_DIGITS[(b >> 4) as usize] as char);
        c_hex.push(HEX_DIGITS[(b & 0x0F) as usize] as char);
    }
    c_hex
}

fn open_regular_file(path_file: &Path) -> FsResult<fs::File> {
    let stat_file = match fs::metadata(path_file) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(FsError::NotFound(path_file.to_path_buf()));
        }
        Err(e) => return Err(FsError::io(path_file, e)),
    };
    if !stat_file.is_file() {
        return Err(FsError::NotAFile(path_file.to_path_buf()));
    }
    fs::File::open(path_file).map_err(|e| FsError::io(path_file, e))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
