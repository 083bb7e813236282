//! Byte-prefix charset sniffing.
//!
//! A heuristic, not a general detector: BOMs are trusted, plain ASCII is
//! reported as UTF-8, and high-bit bytes are checked for UTF-8 structure.
//! Anything else falls back to GBK.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::spec::{EnumCharset, FsError, FsResult, SpecFsOptions};

/// Number of leading bytes inspected by [`sniff`].
pub const N_SNIFF_PREFIX_LEN: usize = 512;

const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];
const BOM_UTF16_BE: [u8; 2] = [0xFE, 0xFF];
const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Guess the encoding of the file at `path` from its first
/// [`N_SNIFF_PREFIX_LEN`] bytes.
///
/// Fails with [`FsError::Io`] when the file cannot be opened and with
/// [`FsError::NotAFile`] for directories. An empty file, or one whose read
/// fails after opening, is reported as [`EnumCharset::Gbk`].
pub fn sniff<P: AsRef<Path>>(path: P) -> FsResult<EnumCharset> {
    sniff_with_limit(path, N_SNIFF_PREFIX_LEN)
}

/// [`sniff`] with an explicit prefix length.
pub fn sniff_with_limit<P: AsRef<Path>>(path: P, n_prefix_len: usize) -> FsResult<EnumCharset> {
    let path_file = path.as_ref();
    let mut file = fs::File::open(path_file).map_err(|e| FsError::io(path_file, e))?;
    let stat_file = file.metadata().map_err(|e| FsError::io(path_file, e))?;
    if stat_file.is_dir() {
        return Err(FsError::NotAFile(path_file.to_path_buf()));
    }

    // One byte past the limit tells a cut-off prefix from a short file.
    let mut raw_prefix = Vec::with_capacity(n_prefix_len.min(N_SNIFF_PREFIX_LEN * 8) + 1);
    if file
        .by_ref()
        .take((n_prefix_len as u64).saturating_add(1))
        .read_to_end(&mut raw_prefix)
        .is_err()
    {
        return Ok(EnumCharset::Gbk);
    }
    let if_truncated = raw_prefix.len() > n_prefix_len;
    raw_prefix.truncate(n_prefix_len);
    Ok(classify(&raw_prefix, if_truncated))
}

/// [`sniff`] using `n_sniff_prefix_len` from the options.
pub fn sniff_with<P: AsRef<Path>>(path: P, spec_fs_options: &SpecFsOptions) -> FsResult<EnumCharset> {
    sniff_with_limit(path, spec_fs_options.n_sniff_prefix_len)
}

/// Classify a complete byte buffer.
pub fn sniff_bytes(raw: &[u8]) -> EnumCharset {
    classify(raw, false)
}

/// Classify the first bytes of a longer stream; a multi-byte sequence cut
/// off at the end of `raw_prefix` still counts as UTF-8.
pub fn sniff_prefix_bytes(raw_prefix: &[u8]) -> EnumCharset {
    classify(raw_prefix, true)
}

fn classify(raw_prefix: &[u8], if_truncated: bool) -> EnumCharset {
    if raw_prefix.is_empty() {
        return EnumCharset::Gbk;
    }
    if raw_prefix.starts_with(&BOM_UTF16_LE) {
        return EnumCharset::Utf16Le;
    }
    if raw_prefix.starts_with(&BOM_UTF16_BE) {
        return EnumCharset::Utf16Be;
    }
    if raw_prefix.starts_with(&BOM_UTF8) {
        return EnumCharset::Utf8;
    }
    if raw_prefix.is_ascii() || is_utf8_consistent(raw_prefix, if_truncated) {
        return EnumCharset::Utf8;
    }
    EnumCharset::Gbk
}

fn is_utf8_consistent(raw_prefix: &[u8], if_truncated: bool) -> bool {
    match std::str::from_utf8(raw_prefix) {
        Ok(_) => true,
        Err(e) => if_truncated && e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{sniff, sniff_bytes, sniff_prefix_bytes, sniff_with, sniff_with_limit};
    use crate::spec::{EnumCharset, FsError, SpecFsOptions};

    #[test]
    fn bom_prefixes_win() {
        assert_eq!(sniff_bytes(&[0xFF, 0xFE, 0x41, 0x00]), EnumCharset::Utf16Le);
        assert_eq!(sniff_bytes(&[0xFE, 0xFF, 0x00, 0x41]), EnumCharset::Utf16Be);
        assert_eq!(sniff_bytes(&[0xEF, 0xBB, 0xBF, b'h', b'i']), EnumCharset::Utf8);
    }

    #[test]
    fn ascii_and_utf8_text_are_utf8() {
        assert_eq!(sniff_bytes(b"plain ascii\nlines\n"), EnumCharset::Utf8);
        assert_eq!(sniff_bytes("中文 text".as_bytes()), EnumCharset::Utf8);
    }

    #[test]
    fn gbk_bytes_fall_back_to_gbk() {
        // "中文" encoded as GBK
        assert_eq!(sniff_bytes(&[0xD6, 0xD0, 0xCE, 0xC4]), EnumCharset::Gbk);
        assert_eq!(sniff_bytes(&[]), EnumCharset::Gbk);
    }

    #[test]
    fn truncated_utf8_sequence_only_tolerated_at_a_cut_prefix() {
        let raw = "ab中".as_bytes();
        assert_eq!(sniff_prefix_bytes(&raw[..raw.len() - 1]), EnumCharset::Utf8);
        assert_eq!(sniff_bytes(&raw[..raw.len() - 1]), EnumCharset::Gbk);
        assert_eq!(sniff_bytes(&[b'a', 0xD6]), EnumCharset::Gbk);
    }

    #[test]
    fn short_file_with_dangling_lead_byte_is_gbk() {
        let tmp = TempDir::new().expect("tempdir");
        let path_short = tmp.path().join("short.txt");
        std::fs::write(&path_short, [b'a', 0xD6]).expect("write");
        assert_eq!(sniff(&path_short).expect("sniff"), EnumCharset::Gbk);

        let path_long = tmp.path().join("long.txt");
        std::fs::write(&path_long, "ab中文".as_bytes()).expect("write");
        assert_eq!(sniff_with_limit(&path_long, 3).expect("sniff"), EnumCharset::Utf8);
        assert_eq!(sniff_with_limit(&path_long, 4).expect("sniff"), EnumCharset::Utf8);
    }

    #[test]
    fn sniff_reads_files() {
        let tmp = TempDir::new().expect("tempdir");
        let path_utf8 = tmp.path().join("UTF8.txt");
        let path_gbk = tmp.path().join("GBK.txt");
        let path_empty = tmp.path().join("empty.txt");
        std::fs::write(&path_utf8, "天气 weather").expect("write utf8");
        std::fs::write(&path_gbk, [0xCC, 0xEC, 0xC6, 0xF8]).expect("write gbk");
        std::fs::write(&path_empty, b"").expect("write empty");

        assert_eq!(sniff(&path_utf8).expect("sniff"), EnumCharset::Utf8);
        assert_eq!(sniff(&path_gbk).expect("sniff"), EnumCharset::Gbk);
        assert_eq!(sniff(&path_empty).expect("sniff"), EnumCharset::Gbk);
    }

    #[test]
    fn sniff_only_looks_at_the_prefix() {
        let tmp = TempDir::new().expect("tempdir");
        let path_file = tmp.path().join("mixed.txt");
        let mut raw = vec![b'a'; 16];
        raw.extend_from_slice(&[0xD6, 0xD0]);
        std::fs::write(&path_file, &raw).expect("write");

        assert_eq!(sniff_with_limit(&path_file, 16).expect("sniff"), EnumCharset::Utf8);
        assert_eq!(sniff(&path_file).expect("sniff"), EnumCharset::Gbk);

        let spec_opts = SpecFsOptions {
            n_sniff_prefix_len: 8,
            ..SpecFsOptions::default()
        };
        assert_eq!(sniff_with(&path_file, &spec_opts).expect("sniff"), EnumCharset::Utf8);
    }

    #[test]
    fn sniff_reports_open_failures() {
        let tmp = TempDir::new().expect("tempdir");
        let err = sniff(tmp.path().join("missing.txt")).expect_err("missing file");
        assert!(matches!(err, FsError::Io { .. }));
    }
}
