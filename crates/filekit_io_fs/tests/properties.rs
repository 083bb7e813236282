use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use filekit_io_fs::{
    AlwaysReplace, EnumCharset, EnumConflictDecision, FsError, NeverReplace, SpecFsOptions,
    copy_dir, copy_dir_with_report, copy_file, create_or_exists_dir, dir_size, move_file, resolve,
    sniff, try_copy_file, walk,
};
use tempfile::TempDir;

fn write_bytes(path: &Path, raw: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, raw).expect("write bytes");
}

fn snapshot(path_root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut l_items: Vec<(PathBuf, Vec<u8>)> = walk(path_root, true, None)
        .expect("walk")
        .map(|res| res.expect("entry"))
        .map(|spec_entry| {
            let raw = if spec_entry.if_is_dir {
                Vec::new()
            } else {
                fs::read(&spec_entry.path).expect("read")
            };
            (spec_entry.path, raw)
        })
        .collect();
    l_items.sort();
    l_items
}

#[test]
fn create_or_exists_dir_twice_leaves_one_directory() {
    let tmp = TempDir::new().expect("tempdir");
    let path_dir = tmp.path().join("made");

    assert!(create_or_exists_dir(&path_dir));
    assert!(create_or_exists_dir(&path_dir));
    assert_eq!(fs::read_dir(tmp.path()).expect("read dir").count(), 1);
}

#[test]
fn copy_dir_onto_itself_or_child_changes_nothing() {
    let tmp = TempDir::new().expect("tempdir");
    let path_src = tmp.path().join("p");
    write_bytes(&path_src.join("a.txt"), b"a");
    write_bytes(&path_src.join("d/b.txt"), b"b");
    let l_before = snapshot(&path_src);

    assert!(!copy_dir(&path_src, &path_src, &AlwaysReplace));
    assert!(!copy_dir(&path_src, path_src.join("sub"), &AlwaysReplace));
    assert!(!copy_dir(&path_src, path_src.join("d/deeper"), &AlwaysReplace));
    assert_eq!(snapshot(&path_src), l_before);
}

#[test]
fn copy_dir_into_sibling_with_relative_segments_is_allowed() {
    let tmp = TempDir::new().expect("tempdir");
    let path_src = tmp.path().join("p");
    write_bytes(&path_src.join("a.txt"), b"a");

    let path_dst = path_src.join("../q");
    assert!(copy_dir(&path_src, &path_dst, &NeverReplace));
    assert_eq!(fs::read(tmp.path().join("q/a.txt")).expect("read"), b"a");
}

#[test]
fn copy_file_policy_keep_and_replace() {
    let tmp = TempDir::new().expect("tempdir");
    let path_src = tmp.path().join("src.bin");
    let path_dst = tmp.path().join("dst.bin");
    write_bytes(&path_src, b"\x00\x01source");
    write_bytes(&path_dst, b"destination");

    let spec_opts = SpecFsOptions::default();
    let err = try_copy_file(&path_src, &path_dst, &spec_opts.rule_conflict_default, &spec_opts)
        .expect_err("default policy keeps");
    assert!(matches!(err, FsError::PolicyRejected(_)));
    assert_eq!(fs::read(&path_dst).expect("read"), b"destination");

    assert!(copy_file(&path_src, &path_dst, &EnumConflictDecision::Replace));
    assert_eq!(
        fs::read(&path_dst).expect("read"),
        fs::read(&path_src).expect("read")
    );
}

#[test]
fn move_file_replaces_and_removes_source() {
    let tmp = TempDir::new().expect("tempdir");
    let path_src = tmp.path().join("src.txt");
    let path_dst = tmp.path().join("dst.txt");
    write_bytes(&path_src, b"moving");
    write_bytes(&path_dst, b"old");

    assert!(move_file(&path_src, &path_dst, &AlwaysReplace));
    assert!(!path_src.exists());
    assert_eq!(fs::read(&path_dst).expect("read"), b"moving");
}

#[test]
fn dir_size_sums_all_files() {
    let tmp = TempDir::new().expect("tempdir");
    write_bytes(&tmp.path().join("ten"), &[1; 10]);
    write_bytes(&tmp.path().join("twenty"), &[2; 20]);
    write_bytes(&tmp.path().join("thirty"), &[3; 30]);

    assert_eq!(dir_size(tmp.path()), 60);
}

#[test]
fn sniff_labels() {
    let tmp = TempDir::new().expect("tempdir");
    let l_cases: [(&str, &[u8], &str); 4] = [
        ("bom8.txt", b"\xEF\xBB\xBFhello", "UTF-8"),
        ("le.txt", b"\xFF\xFEh\x00", "UTF-16LE"),
        ("ascii.txt", b"just ascii", "UTF-8"),
        ("gbk.txt", b"\xC4\xE3\xBA\xC3", "GBK"),
    ];
    for (c_name, raw, c_label) in l_cases {
        let path_file = tmp.path().join(c_name);
        write_bytes(&path_file, raw);
        let enum_charset = sniff(&path_file).expect("sniff");
        assert_eq!(enum_charset.as_str(), c_label, "{c_name}");
    }
    assert_eq!(EnumCharset::Utf16Be.to_string(), "UTF-16BE");
}

#[test]
fn walk_counts_files_and_dirs_with_sizes() {
    let tmp = TempDir::new().expect("tempdir");
    write_bytes(&tmp.path().join("a.bin"), &[0; 3]);
    write_bytes(&tmp.path().join("x/b.bin"), &[0; 5]);
    write_bytes(&tmp.path().join("x/y/c.bin"), &[0; 7]);
    fs::create_dir_all(tmp.path().join("z")).expect("mkdir");

    let l_entries: Vec<_> = walk(tmp.path(), true, None)
        .expect("walk")
        .collect::<Result<_, _>>()
        .expect("entries");
    assert_eq!(l_entries.len(), 3 + 3);
    for spec_entry in l_entries.iter().filter(|v| !v.if_is_dir) {
        let n_len = fs::metadata(&spec_entry.path).expect("meta").len();
        assert_eq!(spec_entry.size_bytes, n_len);
    }
}

#[test]
fn rejected_conflict_inside_copy_dir_aborts_the_call() {
    let tmp = TempDir::new().expect("tempdir");
    let path_src = tmp.path().join("src");
    let path_dst = tmp.path().join("dst");
    write_bytes(&path_src.join("1.txt"), b"one");
    write_bytes(&path_src.join("2.txt"), b"two");
    write_bytes(&path_src.join("3.txt"), b"three");
    write_bytes(&path_dst.join("2.txt"), b"kept");

    let l_asked = RefCell::new(Vec::new());
    let policy = || {
        l_asked.borrow_mut().push(());
        false
    };
    let report = copy_dir_with_report(&path_src, &path_dst, &policy, &SpecFsOptions::default())
        .expect("report");

    assert_eq!(l_asked.borrow().len(), 1);
    assert!(!report.is_success());
    assert_eq!(report.cnt_copied, 1);
    assert_eq!(report.errors[0].path, resolve(path_src.join("2.txt")).expect("resolve"));
    assert_eq!(fs::read(path_dst.join("2.txt")).expect("read"), b"kept");
    assert!(!path_dst.join("3.txt").exists());
    assert!(!copy_dir(&path_src, &path_dst, &policy));
}
