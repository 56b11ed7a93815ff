//! Classify a directory tree against a small built-in rule set without
//! inspecting anything, then report what the traversal counted.
//!
//! Usage:
//!   cargo run --example dry_run_report -- /path/to/scan
//!
//! Demonstrates library-only dry-run usage (spec §4.4 "Dry-run"): no
//! inspection requests are issued and no records are produced; every
//! classification decision is logged instead.

use std::path::PathBuf;

use aide_scan_engine::extract::Capabilities;
use aide_scan_engine::logger::{ScanLoggerConfig, spawn_logger};
use aide_scan_engine::pipeline;
use aide_scan_engine::rules::rule::{AttrMask, EntryKindMask, Rule, RuleKind};
use aide_scan_engine::tree::SelectionTree;

fn main() {
    let root = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let mut tree = SelectionTree::new();
    tree.install_rule(
        std::path::Path::new(""),
        Rule::new("", "^\\..*", RuleKind::Negative, AttrMask::NONE, EntryKindMask::ANY)
            .expect("valid rule"),
    )
    .expect("install rule");
    tree.install_rule(
        std::path::Path::new(""),
        Rule::new("", "^.*$", RuleKind::Selective, AttrMask::ALL, EntryKindMask::ANY)
            .expect("valid rule"),
    )
    .expect("install rule");

    let (logger, join) = spawn_logger(ScanLoggerConfig::default()).expect("spawn logger");

    let (_tree, summary) = pipeline::scan(
        &root,
        tree,
        0,
        4,
        AttrMask::ALL,
        true,
        Capabilities::default(),
        logger.clone(),
    )
    .expect("dry-run scan");

    logger.shutdown();
    let _ = join.join();

    println!("dry-run classification of {}", root.display());
    println!("entries visited:      {}", summary.traversal.entries_visited);
    println!("inspections issued:   {}", summary.traversal.inspections_issued);
    assert_eq!(summary.traversal.inspections_issued, 0, "dry-run must never inspect");
}
