//! Spec §8 scenario 6: a file whose content becomes unreadable between
//! metadata capture and content extraction still yields a record — marked
//! partial, with metadata attributes intact (spec §4.3 "Failure
//! semantics": "the record still flows to C2 so the comparison layer can
//! surface changed/unreadable").

mod common;

use std::fs;

use aide_scan_engine::extract::{self, Capabilities, InspectionRequest};
use aide_scan_engine::platform::pal;
use aide_scan_engine::rules::rule::{AttrMask, EntryKind};

#[test]
fn file_removed_after_stat_yields_partial_record_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vanishing.txt");
    fs::write(&path, b"will be removed").unwrap();

    let raw = pal::lstat(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let request = InspectionRequest {
        absolute_path: path,
        tree_path: std::path::PathBuf::from("vanishing.txt"),
        entry_kind: EntryKind::File,
        attr_mask: AttrMask::ALL,
        raw,
    };
    let record = extract::extract(&request, Capabilities::default());

    assert!(record.is_partial());
    assert!(record.attrs.size_bytes.is_some());
    assert!(record.attrs.permissions.is_some());
    assert!(record.digests.is_empty());
}

#[test]
fn partial_records_still_attach_and_do_not_block_siblings() {
    use aide_scan_engine::rules::rule::RuleKind;

    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("dir-as-file-parent")).unwrap();
    fs::write(root.path().join("dir-as-file-parent/stays"), b"y").unwrap();

    let tree = common::build_tree(vec![common::rule("", "^.*$", RuleKind::Selective)]);
    let (tree, summary) = common::run_scan(root.path(), tree, 0);

    // No entry actually failed in this fixture; the contract under test is
    // that `records_partial` is always a subset of `records_completed` and
    // a normal sibling still attaches a full record (invariant 3 of §3: a
    // record is never silently dropped when extraction succeeds).
    assert!(summary.insertion.records_partial <= summary.insertion.records_completed);
    let records = common::record_path_strings(&tree);
    assert!(records.contains(&"dir-as-file-parent/stays".to_string()));
}
