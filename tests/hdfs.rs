//! HDFS semantics through the façade, served by the in-memory name node.
#![cfg(feature = "hdfs")]

mod common;

use common::{pattern, read_all, ready_vfs};
use unifs::{Uri, VfsError, VfsMode};

#[test]
fn round_trip() {
    let vfs = ready_vfs();
    let dir = Uri::new("hdfs://nn:9000/data");
    let file = Uri::new("hdfs://nn:9000/data/x");

    vfs.create_dir(&dir).unwrap();
    vfs.touch(&file).unwrap();
    vfs.write(&file, b"hello").unwrap();
    vfs.close_file(&file).unwrap();

    assert_eq!(read_all(&vfs, &file), b"hello");
    assert_eq!(vfs.file_size(&file).unwrap(), 5);
}

#[test]
fn create_dir_is_idempotent() {
    let vfs = ready_vfs();
    let dir = Uri::new("hdfs://nn:9000/a/b");

    vfs.create_dir(&dir).unwrap();
    vfs.create_dir(&dir).unwrap();
    assert!(vfs.is_dir(&dir).unwrap());
    // Parents appear as well.
    assert!(vfs.is_dir(&Uri::new("hdfs://nn:9000/a")).unwrap());
}

#[test]
fn ls_keeps_the_authority() {
    let vfs = ready_vfs();
    let dir = Uri::new("hdfs://nn:9000/d");
    vfs.create_dir(&dir).unwrap();
    for name in ["b", "a"] {
        vfs.touch(&dir.join(name)).unwrap();
    }

    let children = vfs.ls(&dir).unwrap();
    assert_eq!(
        children,
        vec![Uri::new("hdfs://nn:9000/d/a"), Uri::new("hdfs://nn:9000/d/b")]
    );
}

#[test]
fn move_dir_is_a_single_rename() {
    let vfs = ready_vfs();
    let old = Uri::new("hdfs://nn:9000/old");
    let new = Uri::new("hdfs://nn:9000/new");

    vfs.create_dir(&old).unwrap();
    vfs.touch(&old.join("f")).unwrap();

    vfs.move_dir(&old, &new).unwrap();
    assert!(!vfs.is_dir(&old).unwrap());
    assert!(vfs.is_file(&new.join("f")).unwrap());
}

#[test]
fn touch_preserves_existing_content() {
    let vfs = ready_vfs();
    let file = Uri::new("hdfs://nn:9000/x");

    vfs.write(&file, b"data").unwrap();
    vfs.touch(&file).unwrap();
    assert_eq!(vfs.file_size(&file).unwrap(), 4);
}

#[test]
fn append_mode_is_allowed() {
    let vfs = ready_vfs();
    vfs.open_file(&Uri::new("hdfs://nn:9000/x"), VfsMode::Append).unwrap();
}

#[test]
fn remove_missing_entries_reports_not_found() {
    let vfs = ready_vfs();
    assert!(matches!(
        vfs.remove_file(&Uri::new("hdfs://nn:9000/absent")),
        Err(VfsError::NotFound { .. })
    ));
    assert!(matches!(
        vfs.remove_dir(&Uri::new("hdfs://nn:9000/absent")),
        Err(VfsError::NotFound { .. })
    ));
}

#[test]
fn parallel_read_matches_sequential() {
    let vfs = ready_vfs();
    let file = Uri::new("hdfs://nn:9000/big");
    let body = pattern(8_192);

    vfs.write(&file, &body).unwrap();
    vfs.close_file(&file).unwrap();

    assert_eq!(read_all(&vfs, &file), body);
}
