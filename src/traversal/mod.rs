//! C4: traversal driver.
//!
//! An explicit-stack DFS walker (spec §4.4): no recursion, so depth is
//! bounded only by available memory — the "deeply nested matches (> 1024
//! levels)" boundary case of spec §8 falls out of this for free. At each
//! popped directory, children are read, sorted by name, and classified
//! against the shared selection tree; the §4.4 descent table decides
//! whether to inspect, push, or skip each one.
//!
//! The driver is generic over how "inspect" is carried out (spec §4.4 step
//! 3): [`SerialInspector`] performs extraction and tree-attach inline (N=0,
//! no queues/threads — spec §5); [`QueueInspector`] enqueues onto Q1 for a
//! worker pool to pick up (spec §4.5). Either way the driver itself never
//! touches C3 or C2's write path directly — it only issues read-only
//! `classify`/`lookup_node` calls against the shared tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::core::errors::{Result, ScanError};
use crate::extract::{self, Capabilities, InspectionRequest};
use crate::logger::{ScanEvent, ScanLoggerHandle};
use crate::platform::pal;
use crate::rules::rule::{AttrMask, EntryKind};
use crate::tree::{MatchResult, SelectionTree};

/// Carries out the "inspect" action of spec §4.4 step 3 for one matched
/// entry. Implementations must never block the driver's own tree-lookup
/// path — they only consume an already-built [`InspectionRequest`].
pub trait Inspect: Send + Sync {
    /// Dispatch one inspection request. A `ScanError` here is treated as
    /// fatal to the scan (spec §7: structural/resource errors abort).
    fn inspect(&self, request: InspectionRequest) -> Result<()>;
}

/// Serial-mode inspector (worker count 0): extracts and attaches inline on
/// the driver's own thread, holding the tree's write lock only for the
/// duration of one `attach_record` call.
///
/// Mirrors the bookkeeping the pipelined worker/inserter pair does across Q2
/// (spec §4.5) so the two modes never diverge on counters or the logged
/// event stream: a partial record logs the same `EntryError` the worker
/// emits before handing a record off, and a successful attach logs the same
/// `RecordCompleted` the inserter emits, counted the same way into the
/// pipeline's `InsertionStats`.
pub struct SerialInspector {
    tree: Arc<RwLock<SelectionTree>>,
    caps: Capabilities,
    logger: ScanLoggerHandle,
    records_completed: AtomicU64,
    records_partial: AtomicU64,
}

impl SerialInspector {
    #[must_use]
    pub fn new(tree: Arc<RwLock<SelectionTree>>, caps: Capabilities, logger: ScanLoggerHandle) -> Self {
        Self {
            tree,
            caps,
            logger,
            records_completed: AtomicU64::new(0),
            records_partial: AtomicU64::new(0),
        }
    }

    /// Records successfully attached so far, matching the pipelined
    /// inserter's `InsertionStats::records_completed`.
    #[must_use]
    pub fn completed_count(&self) -> u64 {
        self.records_completed.load(Ordering::Relaxed)
    }

    /// Attached records that were partial, matching the pipelined
    /// inserter's `InsertionStats::records_partial`.
    #[must_use]
    pub fn partial_count(&self) -> u64 {
        self.records_partial.load(Ordering::Relaxed)
    }
}

impl Inspect for SerialInspector {
    fn inspect(&self, request: InspectionRequest) -> Result<()> {
        let record = extract::extract(&request, self.caps);
        let path = record.path.clone();
        let is_partial = record.is_partial();
        if is_partial {
            self.logger.send(ScanEvent::EntryError {
                path: path.display().to_string(),
                error_code: "AIDE-2002".to_string(),
                error_message: "partial record: see reason field".to_string(),
            });
        }
        self.tree.write().attach_record(&path, record)?;
        self.records_completed.fetch_add(1, Ordering::Relaxed);
        if is_partial {
            self.records_partial.fetch_add(1, Ordering::Relaxed);
        }
        self.logger.send(ScanEvent::RecordCompleted {
            path: path.display().to_string(),
        });
        Ok(())
    }
}

/// Pipeline-mode inspector (worker count > 0): hands the request to Q1 for
/// an extractor worker to pick up (spec §4.5).
pub struct QueueInspector {
    sender: crossbeam_channel::Sender<InspectionRequest>,
}

impl QueueInspector {
    #[must_use]
    pub const fn new(sender: crossbeam_channel::Sender<InspectionRequest>) -> Self {
        Self { sender }
    }
}

impl Inspect for QueueInspector {
    fn inspect(&self, request: InspectionRequest) -> Result<()> {
        self.sender
            .send(request)
            .map_err(|_| ScanError::ChannelClosed { component: "q1" })
    }
}

/// Counters accumulated over one traversal run, surfaced in the scan
/// summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraversalStats {
    pub directories_opened: u64,
    pub directories_unreadable: u64,
    pub entries_visited: u64,
    pub entries_stat_failed: u64,
    pub inspections_issued: u64,
}

/// Run the C4 traversal loop rooted at `root_prefix`.
///
/// `supported_mask` is the intersection of every digest/capability flag the
/// ambient configuration has enabled (spec §4.3 "`attr_mask` ∩
/// `supported_attributes`") — rule-requested attributes outside this mask
/// are silently dropped before an inspection request is built.
///
/// When `dry_run` is set, no inspection is issued for any path; instead a
/// [`ScanEvent::DryRunClassification`] diagnostic is logged for every
/// visited entry (spec §4.4 "Dry-run").
#[allow(clippy::too_many_arguments)]
pub fn run(
    root_prefix: &Path,
    tree: &Arc<RwLock<SelectionTree>>,
    inspector: &dyn Inspect,
    supported_mask: AttrMask,
    dry_run: bool,
    logger: &ScanLoggerHandle,
    abort: &Arc<AtomicBool>,
) -> Result<TraversalStats> {
    let mut stats = TraversalStats::default();
    let mut stack: Vec<PathBuf> = vec![root_prefix.to_path_buf()];

    while let Some(dir_abs) = stack.pop() {
        if abort.load(Ordering::Relaxed) {
            break;
        }

        let read_dir = match std::fs::read_dir(&dir_abs) {
            Ok(rd) => rd,
            Err(source) => {
                stats.directories_unreadable += 1;
                logger.send(ScanEvent::DirUnreadable {
                    path: dir_abs.display().to_string(),
                    error_message: source.to_string(),
                });
                continue;
            }
        };
        stats.directories_opened += 1;

        let mut children: Vec<(std::ffi::OsString, PathBuf)> = Vec::new();
        for entry in read_dir.flatten() {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            children.push((name, entry.path()));
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));

        let mut subdirs: Vec<PathBuf> = Vec::new();

        for (_, child_abs) in children {
            stats.entries_visited += 1;

            let raw = match pal::lstat(&child_abs) {
                Ok(raw) => raw,
                Err(source) => {
                    stats.entries_stat_failed += 1;
                    logger.send(ScanEvent::EntryError {
                        path: child_abs.display().to_string(),
                        error_code: source.code().to_string(),
                        error_message: source.to_string(),
                    });
                    continue;
                }
            };

            let relative = relative_to_root(root_prefix, &child_abs);
            let entry_kind = EntryKind::from_raw(raw.is_dir, raw.is_symlink, raw.is_file);
            let is_real_dir = entry_kind == EntryKind::Dir;

            let (classification, rule) = tree.read().classify(&relative, entry_kind);

            if dry_run {
                logger.send(ScanEvent::DryRunClassification {
                    path: relative.display().to_string(),
                    rule_pattern: rule.as_ref().map(|r| r.pattern.clone()),
                    result: format!("{classification:?}"),
                });
                if is_real_dir && should_descend(classification, &tree.read(), &relative) {
                    subdirs.push(child_abs);
                }
                continue;
            }

            let should_inspect = matches!(
                classification,
                MatchResult::EqualMatch | MatchResult::SelectiveMatch
            );

            if should_inspect {
                let attr_mask = rule
                    .as_ref()
                    .map_or(AttrMask::NONE, |r| r.attr_mask.intersect(supported_mask));
                let request = InspectionRequest {
                    absolute_path: child_abs.clone(),
                    tree_path: relative.clone(),
                    entry_kind,
                    attr_mask,
                    raw,
                };
                stats.inspections_issued += 1;
                inspector.inspect(request)?;
            }

            if is_real_dir && should_descend(classification, &tree.read(), &relative) {
                subdirs.push(child_abs);
            }
        }

        // Push in reverse sorted order so popping preserves sorted DFS order
        // (spec §5: "submission order is the sorted DFS order from the root").
        for subdir in subdirs.into_iter().rev() {
            stack.push(subdir);
        }
    }

    Ok(stats)
}

/// The §4.4 descent table, directory branch only (the entry kind has
/// already been confirmed to be a real directory by the caller).
fn should_descend(classification: MatchResult, tree: &SelectionTree, relative: &Path) -> bool {
    match classification {
        MatchResult::EqualMatch => false,
        MatchResult::SelectiveMatch
        | MatchResult::PartialMatch
        | MatchResult::PartialLimitMatch => true,
        MatchResult::NoMatch => tree.lookup_node(relative).is_some(),
        MatchResult::NoLimitMatch => false,
    }
}

/// Strip `root_prefix` from an absolute child path to get the path stored
/// in / matched against the selection tree (spec §6: "all stored paths are
/// relative to it").
fn relative_to_root(root_prefix: &Path, child_abs: &Path) -> PathBuf {
    child_abs
        .strip_prefix(root_prefix)
        .map_or_else(|_| child_abs.to_path_buf(), Path::to_path_buf)
}
