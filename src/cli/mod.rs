//! Top-level CLI definition and dispatch (spec SPEC_FULL §[SUPPLEMENT] F).
//!
//! A thin `clap`-derived entry point over the library: parse a root prefix,
//! an optional config file, an optional rule-set file, and the worker
//! count/dry-run knobs, then drive one [`crate::pipeline::scan`] run and
//! print a summary. The rule *configuration language* stays out of scope
//! (spec §1) — rules are read through the minimal TOML loader of
//! `crate::rules::loader`, not a re-creation of AIDE's own DSL.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::{Color, Colorize, control};
use std::io::IsTerminal;

use crate::core::config::ScanConfig;
use crate::core::errors::ScanError;
use crate::extract::Capabilities;
use crate::logger::{ScanLoggerConfig, spawn_logger};
use crate::pipeline::{self, ScanSummary};
use crate::rules::loader::load_rule_set_file;
use crate::rules::rule::AttrMask;
use crate::sink::ScanSink;
use crate::tree::SelectionTree;

/// aide-scan — host-based file integrity scan engine.
#[derive(Debug, Parser)]
#[command(
    name = "aide-scan",
    author,
    version,
    about = "Host-based file integrity scan engine",
    long_about = None
)]
pub struct Cli {
    /// Absolute root prefix to scan. Overrides the config file's `scanner.root_prefix`.
    #[arg(long, value_name = "PATH")]
    root: Option<PathBuf>,
    /// Path to a `ScanConfig` TOML file. Defaults to `AIDE_SCAN_CONFIG` or the built-in default path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Path to a minimal TOML rule-set file (`[[rule]]` tables); see `rules::loader`.
    #[arg(long, value_name = "PATH")]
    rules: Option<PathBuf>,
    /// Number of extractor worker threads. 0 = serial mode. Overrides config.
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
    /// Classify and log only; issue no inspection requests.
    #[arg(long)]
    dry_run: bool,
    /// Force serial mode (equivalent to `--workers 0`).
    #[arg(long, conflicts_with = "workers")]
    serial: bool,
    /// Also append completed records as JSONL to this path (spec SPEC_FULL §E).
    #[arg(long, value_name = "PATH")]
    jsonl_out: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

/// Parse arguments and run. Returns a process exit code rather than
/// calling `std::process::exit` directly so `main` stays a two-liner.
pub fn run(args: &Cli) -> ExitCode {
    if args.no_color || !std::io::stdout().is_terminal() {
        control::set_override(false);
    }

    match run_inner(args) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{} {error}", "aide-scan:".color(Color::Red).bold());
            if error.is_fatal() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run_inner(args: &Cli) -> Result<ScanSummary, ScanError> {
    let mut config = ScanConfig::load(args.config.as_deref())?;
    if let Some(root) = &args.root {
        config.scanner.root_prefix = root.clone();
    }
    if args.serial {
        config.scanner.worker_count = 0;
    } else if let Some(workers) = args.workers {
        config.scanner.worker_count = workers;
    }
    if args.dry_run {
        config.scanner.dry_run = true;
    }

    let mut tree = SelectionTree::new();
    let mut rule_count = 0usize;
    if let Some(rules_path) = &args.rules {
        for anchored in load_rule_set_file(rules_path)? {
            tree.install_rule(&anchored.anchor, anchored.rule)?;
            rule_count += 1;
        }
    }

    let (logger, logger_join) = spawn_logger(ScanLoggerConfig::default())?;
    logger.send(crate::logger::ScanEvent::RulesLoaded { count: rule_count });

    let caps = Capabilities {
        xattrs: config.capabilities.xattrs,
        acl: config.capabilities.acl,
        selinux: config.capabilities.selinux,
        e2fsattrs: config.capabilities.e2fsattrs,
    };
    let supported_mask = supported_attr_mask(&config);

    let (tree, summary) = pipeline::scan(
        &config.scanner.root_prefix,
        tree,
        config.scanner.worker_count,
        config.scanner.queue_capacity_factor,
        supported_mask,
        config.scanner.dry_run,
        caps,
        logger.clone(),
    )?;

    if let Some(jsonl_path) = &args.jsonl_out {
        let mut sink = crate::sink::JsonlSink::open(jsonl_path)?;
        for path in tree.all_record_paths() {
            if let Some(record) = tree.record_at(&path) {
                crate::sink::ScanSink::accept(&mut sink, record)?;
            }
        }
    }

    logger.shutdown();
    let _ = logger_join.join();

    Ok(summary)
}

fn supported_attr_mask(config: &ScanConfig) -> AttrMask {
    let mut mask = AttrMask::METADATA_ONLY;
    if config.digest.sha256 {
        mask = mask.union(AttrMask::SHA256);
    }
    if config.capabilities.xattrs {
        mask = mask.union(AttrMask::XATTRS);
    }
    if config.capabilities.acl {
        mask = mask.union(AttrMask::ACL);
    }
    if config.capabilities.selinux {
        mask = mask.union(AttrMask::SELINUX);
    }
    if config.capabilities.e2fsattrs {
        mask = mask.union(AttrMask::E2FSATTRS);
    }
    mask
}

fn print_summary(summary: &ScanSummary) {
    println!(
        "{} {} dirs, {} entries visited, {} inspected, {} records ({} partial), {} unreadable dirs, {:.2?}",
        "scan complete:".color(Color::Green).bold(),
        summary.traversal.directories_opened,
        summary.traversal.entries_visited,
        summary.traversal.inspections_issued,
        summary.insertion.records_completed,
        summary.insertion.records_partial,
        summary.traversal.directories_unreadable,
        summary.duration,
    );
}
