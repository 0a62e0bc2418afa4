//! Artifact Store Integration Tests
//!
//! Listing, deletion and path-escape handling against a real directory.

use std::fs;

use barcoder::store::{ArtifactStore, StoreError};
use tempfile::TempDir;

/// Layout: <temp>/secret.txt next to <temp>/barcodes/
fn setup() -> (TempDir, ArtifactStore) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("barcodes");
    fs::create_dir(&root).unwrap();
    fs::write(temp.path().join("secret.txt"), b"top secret").unwrap();
    fs::write(temp.path().join("secret.png"), b"outside").unwrap();
    (temp, ArtifactStore::open_existing(root).unwrap())
}

#[test]
fn test_list_filters_non_images() {
    let (_temp, store) = setup();
    let root = store.root().to_path_buf();

    fs::write(root.join("a.png"), b"1").unwrap();
    fs::write(root.join("b.JPG"), b"2").unwrap();
    fs::write(root.join("c.jpeg"), b"3").unwrap();
    fs::write(root.join("d.gif"), b"4").unwrap();
    fs::write(root.join("notes.txt"), b"5").unwrap();
    fs::write(root.join("README"), b"6").unwrap();

    let mut names = store.list().unwrap();
    names.sort();
    assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg", "d.gif"]);
}

#[test]
fn test_list_reflects_current_contents() {
    let (_temp, store) = setup();
    assert!(store.list().unwrap().is_empty());

    fs::write(store.root().join("late.png"), b"x").unwrap();
    assert_eq!(store.list().unwrap(), vec!["late.png".to_string()]);

    fs::remove_file(store.root().join("late.png")).unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_delete_existing_file() {
    let (_temp, store) = setup();
    fs::write(store.root().join("x"), b"data").unwrap();
    fs::write(store.root().join("keep.png"), b"data").unwrap();

    assert!(store.exists("x"));
    store.delete("x").unwrap();
    assert!(!store.exists("x"));
    assert!(store.exists("keep.png"));
}

#[test]
fn test_delete_missing_file_is_not_found() {
    let (_temp, store) = setup();
    fs::write(store.root().join("keep.png"), b"data").unwrap();

    let result = store.delete("x");
    assert!(matches!(result, Err(StoreError::NotFound(ref name)) if name == "x"));
    assert_eq!(store.list().unwrap(), vec!["keep.png".to_string()]);
}

#[test]
fn test_delete_outside_directory_rejected() {
    let (temp, store) = setup();

    let result = store.delete("../secret.txt");
    assert!(result.unwrap_err().is_not_found());
    assert!(temp.path().join("secret.txt").exists());
}

#[test]
fn test_open_rejects_traversal() {
    let (_temp, store) = setup();

    for name in ["../secret.txt", "../secret.png", "..", "/etc/passwd", "sub/../../secret.txt"] {
        let result = store.open(name);
        assert!(
            matches!(result, Err(StoreError::PathEscape(_))),
            "{} should be rejected",
            name
        );
        assert!(store.read(name).unwrap_err().is_not_found());
    }
}

#[test]
fn test_open_missing_is_not_found() {
    let (_temp, store) = setup();
    assert!(matches!(store.open("nope.png"), Err(StoreError::NotFound(_))));
}

#[test]
fn test_exists_never_sees_outside() {
    let (_temp, store) = setup();
    assert!(!store.exists("../secret.txt"));
    assert!(!store.exists(""));
}

#[cfg(unix)]
#[test]
fn test_open_rejects_symlink_escape() {
    let (temp, store) = setup();
    std::os::unix::fs::symlink(temp.path().join("secret.png"), store.root().join("link.png"))
        .unwrap();

    let result = store.open("link.png");
    assert!(matches!(result, Err(StoreError::PathEscape(_))));
    assert!(store.read("link.png").unwrap_err().is_not_found());
}

#[test]
fn test_read_returns_contents() {
    let (_temp, store) = setup();
    fs::write(store.root().join("SN001 Acme 555.png"), b"png-bytes").unwrap();

    assert_eq!(store.read("SN001 Acme 555.png").unwrap(), b"png-bytes");
}
