//! Spec §8 "Boundary behavior": empty root, deep nesting, symlink-to-
//! directory (never descended), and an unreadable directory (scan
//! continues elsewhere).

mod common;

use std::fs;
use std::path::Path;

use aide_scan_engine::rules::rule::RuleKind;

#[test]
fn empty_root_completes_with_no_records() {
    let root = tempfile::tempdir().unwrap();
    let tree = common::build_tree(vec![common::rule("", "^.*$", RuleKind::Selective)]);
    let (tree, summary) = common::run_scan(root.path(), tree, 4);

    assert_eq!(summary.traversal.entries_visited, 0);
    assert!(tree.all_record_paths().is_empty());
}

#[test]
fn deeply_nested_tree_completes_without_overflow() {
    let root = tempfile::tempdir().unwrap();
    let mut cur = root.path().to_path_buf();
    for i in 0..1500 {
        cur = cur.join(format!("level{i}"));
        fs::create_dir(&cur).unwrap();
    }
    fs::write(cur.join("leaf.txt"), b"deep").unwrap();

    let tree = common::build_tree(vec![common::rule(
        "",
        "^.*$",
        RuleKind::Selective,
    )]);
    let (tree, _summary) = common::run_scan(root.path(), tree, 4);

    assert!(tree.record_count() > 1500);
}

#[test]
#[cfg(unix)]
fn symlink_to_directory_is_never_descended() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("real")).unwrap();
    fs::write(root.path().join("real/inside"), b"x").unwrap();
    std::os::unix::fs::symlink(root.path().join("real"), root.path().join("link")).unwrap();

    let tree = common::build_tree(vec![common::rule("", "^.*$", RuleKind::Selective)]);
    let (tree, _summary) = common::run_scan(root.path(), tree, 0);

    let records = common::record_path_strings(&tree);
    assert!(records.contains(&"link".to_string()));
    assert!(!records.iter().any(|p| p.starts_with("link/")));
    assert!(records.contains(&"real/inside".to_string()));
}

#[test]
#[cfg(unix)]
fn unreadable_directory_is_logged_and_scan_continues() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("locked")).unwrap();
    fs::write(root.path().join("locked/secret"), b"s").unwrap();
    fs::create_dir(root.path().join("open")).unwrap();
    fs::write(root.path().join("open/visible"), b"v").unwrap();

    fs::set_permissions(root.path().join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

    let tree = common::build_tree(vec![common::rule("", "^.*$", RuleKind::Selective)]);
    let (tree, summary) = common::run_scan(root.path(), tree, 0);

    // Restore permissions so the tempdir can be cleaned up.
    fs::set_permissions(root.path().join("locked"), fs::Permissions::from_mode(0o755)).unwrap();

    assert!(summary.traversal.directories_unreadable >= 1);
    let records = common::record_path_strings(&tree);
    assert!(records.contains(&"open/visible".to_string()));
    assert!(!records.iter().any(|p| p.starts_with("locked/")));
}

#[test]
fn lookup_node_reports_existing_interior_structure() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("a/b")).unwrap();
    fs::write(root.path().join("a/b/only-match"), b"m").unwrap();

    let tree = common::build_tree(vec![common::rule("", "^a/b/only-match$", RuleKind::Equal)]);
    let (tree, _summary) = common::run_scan(root.path(), tree, 0);

    assert!(tree.lookup_node(Path::new("a")).is_some());
    assert!(tree.lookup_node(Path::new("a/b")).is_some());
    assert_eq!(common::record_path_strings(&tree), vec!["a/b/only-match"]);
}
