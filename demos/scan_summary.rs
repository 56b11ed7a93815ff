//! Scan a directory tree with a single "match everything" rule and print
//! the resulting record count.
//!
//! Usage:
//!   cargo run --example scan_summary -- /path/to/scan

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
        Rule::new("", "^.*$", RuleKind::Selective, AttrMask::METADATA_ONLY, EntryKindMask::ANY)
            .expect("valid rule"),
    )
    .expect("install rule");

    let (logger, join) = spawn_logger(ScanLoggerConfig::default()).expect("spawn logger");

    let (tree, summary) = pipeline::scan(
        &root,
        tree,
        4,
        4,
        AttrMask::METADATA_ONLY,
        false,
        Capabilities::default(),
        logger.clone(),
    )
    .expect("scan");

    logger.shutdown();
    let _ = join.join();

    println!("scanned {}", root.display());
    println!("directories opened: {}", summary.traversal.directories_opened);
    println!("entries visited:    {}", summary.traversal.entries_visited);
    println!("records produced:   {}", tree.record_count());
    println!("partial records:    {}", summary.insertion.records_partial);
    println!("duration:           {:.2?}", summary.duration);
}
