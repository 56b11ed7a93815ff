//! Shared fixtures for cross-module end-to-end scan tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use aide_scan_engine::extract::Capabilities;
use aide_scan_engine::logger::{ScanLoggerConfig, ScanLoggerHandle, spawn_logger};
use aide_scan_engine::pipeline::{self, ScanSummary};
use aide_scan_engine::rules::rule::{AttrMask, EntryKindMask, Rule, RuleKind};
use aide_scan_engine::tree::SelectionTree;

/// A logger handle backed by a throwaway JSONL file, for tests that don't
/// care about log content but still need a valid `ScanLoggerHandle`.
pub fn test_logger() -> (ScanLoggerHandle, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = ScanLoggerConfig {
        jsonl_config: aide_scan_engine::logger::jsonl::JsonlConfig {
            path: dir.path().join("scan.jsonl"),
            fallback_path: None,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 60,
        },
        channel_capacity: 256,
    };
    let (handle, _join) = spawn_logger(config).unwrap();
    (handle, dir)
}

pub fn rule(anchor: &str, pattern: &str, kind: RuleKind) -> (PathBuf, Rule) {
    (
        PathBuf::from(anchor),
        Rule::new(anchor, pattern, kind, AttrMask::ALL, EntryKindMask::ANY).unwrap(),
    )
}

pub fn build_tree(rules: Vec<(PathBuf, Rule)>) -> SelectionTree {
    let mut tree = SelectionTree::new();
    for (anchor, rule) in rules {
        tree.install_rule(&anchor, rule).unwrap();
    }
    tree
}

/// Run a full scan (pipeline or serial, depending on `workers`) and return
/// the populated tree plus summary. Drains the logger thread on return.
pub fn run_scan(root: &Path, tree: SelectionTree, workers: usize) -> (SelectionTree, ScanSummary) {
    let (logger, _dir) = test_logger();
    pipeline::scan(
        root,
        tree,
        workers,
        4,
        AttrMask::ALL,
        false,
        Capabilities::default(),
        logger,
    )
    .unwrap()
}

pub fn run_dry_run(root: &Path, tree: SelectionTree, workers: usize) -> (SelectionTree, ScanSummary) {
    let (logger, _dir) = test_logger();
    pipeline::scan(
        root,
        tree,
        workers,
        4,
        AttrMask::ALL,
        true,
        Capabilities::default(),
        logger,
    )
    .unwrap()
}

/// Sorted relative record paths as strings, for easy `assert_eq!` against a
/// literal list.
pub fn record_path_strings(tree: &SelectionTree) -> Vec<String> {
    tree.all_record_paths()
        .into_iter()
        .map(|p| p.display().to_string())
        .collect()
}
