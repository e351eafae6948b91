//! Fjall-backed filesystems: persistence across reopen and file contents

use dsvn_fs::{clone_root, open_path, Filesystem, FsConfig, FsError};
use tempfile::TempDir;

fn config(dir: &TempDir) -> FsConfig {
    FsConfig {
        node_cache_capacity: 64,
        ..FsConfig::at(dir.path().join("fs"))
    }
}

fn commit_file(fs: &Filesystem, path: &[&str], contents: &[u8]) -> u64 {
    let youngest = fs.youngest_rev().unwrap();
    let txn = fs.begin_txn(youngest).unwrap();
    fs.run_trail(|trail| {
        let (file_name, dirs) = path.split_last().expect("non-empty path");
        let mut node = clone_root(trail, &txn)?;
        for dir in dirs {
            node = match node.clone_child(trail, dir) {
                Ok(child) => child,
                Err(FsError::NotFound(_)) => node.make_dir(trail, dir)?,
                Err(e) => return Err(e),
            };
        }
        let mut file = match node.clone_child(trail, file_name) {
            Ok(child) => child,
            Err(FsError::NotFound(_)) => node.make_file(trail, file_name)?,
            Err(e) => return Err(e),
        };
        file.set_contents(trail, contents)
    })
    .unwrap();
    fs.commit_txn(&txn).unwrap()
}

#[test]
fn test_reopen_keeps_revisions() {
    let dir = TempDir::new().unwrap();

    let uuid = {
        let fs = Filesystem::open(config(&dir)).unwrap();
        assert_eq!(commit_file(&fs, &["trunk", "README"], b"hello\n"), 1);
        fs.uuid().to_string()
    };

    let fs = Filesystem::open(config(&dir)).unwrap();
    assert_eq!(fs.uuid(), uuid);
    assert_eq!(fs.youngest_rev().unwrap(), 1);
    assert_eq!(fs.file_contents(1, "trunk/README").unwrap(), b"hello\n");

    assert_eq!(commit_file(&fs, &["trunk", "README"], b"hello again\n"), 2);
    assert_eq!(fs.file_contents(1, "trunk/README").unwrap(), b"hello\n");
    assert_eq!(fs.file_contents(2, "/trunk/README").unwrap(), b"hello again\n");
}

#[test]
fn test_history_of_edited_file() {
    let dir = TempDir::new().unwrap();
    let fs = Filesystem::open(config(&dir)).unwrap();

    let mut versions = Vec::new();
    let mut contents: Vec<u8> = (0..300)
        .flat_map(|i| format!("fn item_{}() -> u32 {{ {} }}\n", i, i * 7).into_bytes())
        .collect();
    for round in 0..6 {
        let at = contents.len() / 2;
        let patch = format!("// revision {}\n", round);
        contents.splice(at..at, patch.into_bytes());
        let rev = commit_file(&fs, &["src", "lib.rs"], &contents);
        versions.push((rev, contents.clone()));
    }

    for (rev, expected) in &versions {
        assert_eq!(&fs.file_contents(*rev, "src/lib.rs").unwrap(), expected);
    }
}

#[test]
fn test_committed_tree_is_immutable() {
    let dir = TempDir::new().unwrap();
    let fs = Filesystem::open(config(&dir)).unwrap();
    let rev = commit_file(&fs, &["a", "b", "c.txt"], b"deep");

    fs.run_trail(|trail| {
        let root = dsvn_fs::revision_root(trail, rev)?;
        let file = open_path(trail, &root, "a/b/c.txt")?;
        assert!(!root.is_mutable());
        assert!(!file.is_mutable());

        let mut file = file;
        assert!(matches!(file.set_contents(trail, b"x"), Err(FsError::NotMutable(_))));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_missing_paths_and_revisions() {
    let dir = TempDir::new().unwrap();
    let fs = Filesystem::open(config(&dir)).unwrap();
    commit_file(&fs, &["f"], b"x");

    assert!(matches!(fs.file_contents(1, "g"), Err(FsError::NotFound(_))));
    assert!(matches!(fs.file_contents(5, "f"), Err(FsError::NotFound(_))));
    assert!(matches!(fs.begin_txn(5), Err(FsError::NotFound(_))));
    assert!(matches!(fs.file_contents(1, ""), Err(FsError::NotFile(_))));
}

#[test]
fn test_config_roundtrip_opens_same_fs() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("fs.json");
    config(&dir).save(&config_path).unwrap();

    let loaded = FsConfig::load(&config_path).unwrap();
    assert_eq!(loaded, config(&dir));

    let fs = Filesystem::open(loaded).unwrap();
    assert_eq!(fs.youngest_rev().unwrap(), 0);
}
