//! DAG operations inside transactions

use dsvn_fs::{clone_root, revision_root, Filesystem, FsConfig, FsError, Skel};

fn new_fs() -> Filesystem {
    dsvn_fs::logging::init_tracing(false);
    Filesystem::in_memory(FsConfig::default()).unwrap()
}

fn names(node: &dsvn_fs::DagNode) -> Vec<String> {
    node.entries().unwrap().iter().map(|e| e.name.clone()).collect()
}

#[test]
fn test_trunk_readme_scenario() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();

    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        root.make_dir(trail, "trunk")?;
        let mut trunk = root.clone_child(trail, "trunk")?;
        let readme = trunk.make_file(trail, "README")?;

        assert_eq!(names(&root), vec!["trunk"]);
        assert_eq!(names(&trunk), vec!["README"]);
        assert!(trunk.is_mutable());
        assert!(readme.is_mutable());
        assert!(readme.is_file());

        let base_root = revision_root(trail, 0)?;
        assert!(base_root.entries()?.is_empty());
        assert!(!base_root.is_mutable());
        Ok(())
    })
    .unwrap();

    let rev = fs.commit_txn(&txn).unwrap();
    assert_eq!(rev, 1);

    let root = fs.revision_root(1).unwrap();
    assert_eq!(names(&root), vec!["trunk"]);
    assert!(!root.is_mutable());
    assert!(fs.revision_root(0).unwrap().entries().unwrap().is_empty());
}

#[test]
fn test_clone_preserves_base_revision() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        let mut dir = root.make_dir(trail, "a")?;
        dir.make_dir(trail, "b")?;
        Ok(())
    })
    .unwrap();
    fs.commit_txn(&txn).unwrap();

    let txn = fs.begin_txn(1).unwrap();
    fs.run_trail(|trail| {
        let base = revision_root(trail, 1)?;
        let mut root = clone_root(trail, &txn)?;
        assert_ne!(root.id(), base.id());

        let mut a = root.clone_child(trail, "a")?;
        let b = a.clone_child(trail, "b")?;
        for node in [&root, &a, &b] {
            assert!(node.is_mutable(), "{} should be mutable", node.id());
        }

        let base_a = base.open(trail, "a")?;
        assert!(!base_a.is_mutable());
        assert_ne!(base_a.id(), a.id());
        assert!(!base_a.open(trail, "b")?.is_mutable());
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_clone_child_is_idempotent() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        root.make_dir(trail, "trunk")?;
        Ok(())
    })
    .unwrap();
    fs.commit_txn(&txn).unwrap();

    let txn = fs.begin_txn(1).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        let first = root.clone_child(trail, "trunk")?;
        let second = root.clone_child(trail, "trunk")?;
        assert_eq!(first.id(), second.id());
        assert_eq!(root.entries()?[0].id, *first.id());
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_delete_guards_non_empty_mutable_dir() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        root.make_file(trail, "first")?;
        let mut full = root.make_dir(trail, "full")?;
        full.make_file(trail, "inside")?;
        root.make_dir(trail, "empty")?;
        root.make_file(trail, "last")?;

        assert!(matches!(root.delete(trail, "full"), Err(FsError::DirNotEmpty(_))));
        root.delete(trail, "empty")?;
        assert_eq!(names(&root), vec!["first", "full", "last"]);

        assert!(matches!(root.delete(trail, "empty"), Err(FsError::NoSuchEntry(_))));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_delete_immutable_dir_with_contents() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        let mut tags = root.make_dir(trail, "tags")?;
        tags.make_dir(trail, "1.0")?;
        Ok(())
    })
    .unwrap();
    fs.commit_txn(&txn).unwrap();

    let txn = fs.begin_txn(1).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        root.delete(trail, "tags")?;
        assert!(root.entries()?.is_empty());
        Ok(())
    })
    .unwrap();
    fs.commit_txn(&txn).unwrap();

    assert!(fs.revision_root(2).unwrap().entries().unwrap().is_empty());
    assert_eq!(names(&fs.revision_root(1).unwrap()), vec!["tags"]);
}

#[test]
fn test_immutable_nodes_reject_changes() {
    let fs = new_fs();
    fs.run_trail(|trail| {
        let mut root = revision_root(trail, 0)?;
        assert!(matches!(root.make_file(trail, "f"), Err(FsError::NotMutable(_))));
        assert!(matches!(root.make_dir(trail, "d"), Err(FsError::NotMutable(_))));
        assert!(matches!(root.clone_child(trail, "d"), Err(FsError::NotMutable(_))));
        assert!(matches!(root.delete(trail, "d"), Err(FsError::NotMutable(_))));
        assert!(matches!(
            root.set_proplist(trail, &Skel::empty_list()),
            Err(FsError::NotMutable(_))
        ));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_entry_errors() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        let mut file = root.make_file(trail, "file")?;

        assert!(matches!(root.make_dir(trail, "file"), Err(FsError::AlreadyExists(_))));
        assert!(matches!(root.clone_child(trail, "missing"), Err(FsError::NotFound(_))));
        assert!(matches!(file.delete(trail, "x"), Err(FsError::NotDirectory(_))));
        assert!(matches!(file.make_file(trail, "x"), Err(FsError::NotDirectory(_))));
        assert!(matches!(file.clone_child(trail, "x"), Err(FsError::NotDirectory(_))));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_proplist_replace_and_validation() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();
    fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        let mut file = root.make_file(trail, "f")?;
        assert!(file.get_proplist().is_empty());

        let props = Skel::parse(b"(svn:mime-type 10 text/plain)").unwrap();
        file.set_proplist(trail, &props)?;
        assert_eq!(file.get_proplist().get("svn:mime-type").unwrap().as_ref(), b"text/plain");
        assert_eq!(file.get_proplist().to_skel(), props);

        let odd = Skel::parse(b"(a b c)").unwrap();
        assert!(matches!(file.set_proplist(trail, &odd), Err(FsError::MalformedSkel(_))));
        let nested = Skel::parse(b"(a (b))").unwrap();
        assert!(matches!(file.set_proplist(trail, &nested), Err(FsError::MalformedSkel(_))));

        // Failed updates leave the stored list alone
        let reread = root.open(trail, "f")?;
        assert_eq!(reread.get_proplist().len(), 1);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_failed_trail_leaves_transaction_untouched() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();

    let result: dsvn_fs::Result<()> = fs.run_trail(|trail| {
        let mut root = clone_root(trail, &txn)?;
        root.make_file(trail, "a")?;
        root.make_file(trail, "a")?;
        Ok(())
    });
    assert!(matches!(result, Err(FsError::AlreadyExists(_))));

    fs.run_trail(|trail| {
        let root = clone_root(trail, &txn)?;
        assert!(root.entries()?.is_empty());
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_handles_from_before_commit_cannot_change_revision() {
    let fs = new_fs();
    let txn = fs.begin_txn(0).unwrap();
    let (mut root, mut docs, mut file) = fs
        .run_trail(|trail| {
            let mut root = clone_root(trail, &txn)?;
            let mut docs = root.make_dir(trail, "docs")?;
            docs.make_file(trail, "keep")?;
            let mut file = root.make_file(trail, "notes")?;
            file.set_contents(trail, b"v1")?;
            Ok((root, docs, file))
        })
        .unwrap();
    assert_eq!(fs.commit_txn(&txn).unwrap(), 1);

    fs.run_trail(|trail| {
        assert!(matches!(root.make_file(trail, "late"), Err(FsError::NotMutable(_))));
        assert!(matches!(root.make_dir(trail, "late"), Err(FsError::NotMutable(_))));
        assert!(matches!(root.clone_child(trail, "docs"), Err(FsError::NotMutable(_))));
        assert!(matches!(root.delete(trail, "notes"), Err(FsError::NotMutable(_))));
        assert!(matches!(docs.delete(trail, "keep"), Err(FsError::NotMutable(_))));
        let props = Skel::parse(b"(color red)").unwrap();
        assert!(matches!(file.set_proplist(trail, &props), Err(FsError::NotMutable(_))));
        assert!(matches!(file.set_contents(trail, b"v2"), Err(FsError::NotMutable(_))));
        Ok(())
    })
    .unwrap();

    let root = fs.revision_root(1).unwrap();
    assert_eq!(names(&root), vec!["docs", "notes"]);
    assert_eq!(fs.file_contents(1, "notes").unwrap(), b"v1");
    fs.run_trail(|trail| {
        let docs = root.open(trail, "docs")?;
        assert_eq!(names(&docs), vec!["keep"]);
        assert!(root.open(trail, "notes")?.get_proplist().is_empty());
        Ok(())
    })
    .unwrap();
}
