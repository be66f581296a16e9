use std::fs;
use std::io::{Read, Write};

use tempfile::TempDir;

use vfs_core::{OpenMode, Vfs};
use vfs_host::{mount_syspath, HostDir};
use vfs_mem::VDir;

#[test]
fn locate_always_succeeds_and_query_reports_existence() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("present.txt"), b"here").unwrap();

    let root = HostDir::new_node(tmp.path());

    let present = root.locate("present.txt").unwrap();
    let info = present.query();
    assert!(info.exists && !info.is_dir && !info.is_readonly);

    // missing paths still resolve to a node; only the query says "no"
    let missing = root.locate("missing/deep.txt").unwrap();
    let info = missing.query();
    assert!(!info.exists && !info.error);
}

#[test]
fn files_read_and_write_through_nodes() {
    let tmp = TempDir::new().unwrap();
    let root = HostDir::new_node(tmp.path());

    let node = root.locate("out.txt").unwrap();
    let mut stream = node.open(OpenMode::WRITE).unwrap();
    stream.write_all(b"written through the vfs").unwrap();
    drop(stream);

    let mut out = Vec::new();
    node.open(OpenMode::READ)
        .unwrap()
        .read_to_end(&mut out)
        .unwrap();
    assert_eq!(out, b"written through the vfs");

    // write mode truncates
    node.open(OpenMode::WRITE).unwrap().write_all(b"x").unwrap();
    assert_eq!(fs::read(tmp.path().join("out.txt")).unwrap(), b"x");
}

#[test]
fn iter_lists_directory_entries() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a"), b"").unwrap();
    fs::create_dir(tmp.path().join("d")).unwrap();

    let root = HostDir::new_node(tmp.path());
    let mut names: Vec<String> = root.iter().unwrap().collect();
    names.sort();
    assert_eq!(names, ["a", "d"]);

    assert!(root.locate("a").unwrap().iter().is_err());
}

#[test]
fn mkdir_tolerates_existing_directories_but_not_files() {
    let tmp = TempDir::new().unwrap();
    let root = HostDir::new_node(tmp.path());

    root.mkdir(Some("sub")).unwrap();
    root.mkdir(Some("sub")).unwrap();
    assert!(tmp.path().join("sub").is_dir());

    fs::write(tmp.path().join("file"), b"").unwrap();
    assert!(root.mkdir(Some("file")).is_err());
}

#[test]
fn syspath_reports_the_real_location() {
    let tmp = TempDir::new().unwrap();
    let root = HostDir::new_node(tmp.path());

    let node = root.locate("a/b").unwrap();
    assert_eq!(
        node.syspath().unwrap(),
        tmp.path().join("a").join("b")
    );
    assert_eq!(node.repr(true), tmp.path().join("a").join("b").display().to_string());
}

#[test]
fn mount_syspath_can_create_the_backing_directory() {
    let tmp = TempDir::new().unwrap();
    let storage = tmp.path().join("storage");
    assert!(!storage.exists());

    let vfs = Vfs::new(VDir::new_node());
    mount_syspath(&vfs, "storage", &storage, true).unwrap();
    assert!(storage.is_dir());

    vfs.open("storage/save.dat", OpenMode::WRITE)
        .unwrap()
        .write_all(b"progress")
        .unwrap();
    assert_eq!(fs::read(storage.join("save.dat")).unwrap(), b"progress");

    assert!(vfs.query("storage").is_dir);
    assert!(!vfs.query("storage").is_readonly);
}
