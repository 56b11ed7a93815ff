//! C5: pipeline.
//!
//! Wires the traversal driver (C4), the extractor worker pool (C3), and the
//! tree-insertion consumer (C2's writer) together through the two bounded
//! queues of spec §4.5. When `worker_count == 0` (serial mode, spec §5:
//! "the driver invokes extraction and insertion inline; no queues or
//! threads are created") the whole pipeline collapses to a direct call on
//! the calling thread — [`run_serial`] does this without spawning anything.
//!
//! Otherwise [`run_pipelined`] spawns the tree inserter, then N workers,
//! then runs the driver on the calling thread (spec §4.5 "Lifecycle"). Q1
//! has exactly one producer (the driver) and N consumers (the workers); Q2
//! has N producers and one consumer (the inserter). Channel closing is
//! entirely drop-driven: crossbeam's bounded channel already returns
//! "disconnected" from a `recv()` once every sender clone is gone, which is
//! precisely the closed-and-empty semantics spec §4.5 describes — no
//! explicit close handshake is needed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::RwLock;

use crate::core::errors::{Result, ScanError};
use crate::extract::{self, Capabilities, InspectionRequest};
use crate::logger::{ScanEvent, ScanLoggerHandle};
use crate::record::CompletedRecord;
use crate::rules::rule::AttrMask;
use crate::traversal::{self, Inspect, QueueInspector, SerialInspector, TraversalStats};
use crate::tree::SelectionTree;

/// Counters accumulated by the tree-insertion consumer over one scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertionStats {
    pub records_completed: u64,
    pub records_partial: u64,
}

/// Everything produced by one full scan run, handed back to the caller
/// alongside the populated [`SelectionTree`] (spec §6 "Outputs produced").
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSummary {
    pub traversal: TraversalStats,
    pub insertion: InsertionStats,
    pub duration: Duration,
}

/// Run a complete scan: freezes `tree`'s rule lists, then drives C4 either
/// inline (`worker_count == 0`) or through the full C3/C5 pipeline.
///
/// `tree` must already have every rule installed; this function freezes it
/// (spec §3 invariant 5: "rule lists are frozen at scan start").
pub fn scan(
    root_prefix: &std::path::Path,
    mut tree: SelectionTree,
    worker_count: usize,
    queue_capacity_factor: usize,
    supported_mask: AttrMask,
    dry_run: bool,
    caps: Capabilities,
    logger: ScanLoggerHandle,
) -> Result<(SelectionTree, ScanSummary)> {
    tree.freeze();
    let tree = Arc::new(RwLock::new(tree));
    let started = Instant::now();

    logger.send(ScanEvent::ScanStarted {
        root_prefix: root_prefix.display().to_string(),
    });

    let (traversal_stats, insertion_stats) = if worker_count == 0 {
        run_serial(root_prefix, &tree, supported_mask, dry_run, caps, logger.clone())?
    } else {
        run_pipelined(
            root_prefix,
            Arc::clone(&tree),
            worker_count,
            queue_capacity_factor,
            supported_mask,
            dry_run,
            caps,
            logger.clone(),
        )?
    };

    let duration = started.elapsed();
    logger.send(ScanEvent::ScanCompleted {
        entries_inspected: traversal_stats.inspections_issued,
        records_completed: insertion_stats.records_completed,
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    });

    // Every thread that held a clone of `tree` has been joined by this
    // point (serial mode spawns none; pipelined mode joins every worker
    // and the inserter above), so exactly one strong reference remains.
    let tree = Arc::try_unwrap(tree).map_or_else(
        |_| unreachable!("all scan threads are joined before unwrapping the shared tree"),
        RwLock::into_inner,
    );

    Ok((
        tree,
        ScanSummary {
            traversal: traversal_stats,
            insertion: insertion_stats,
            duration,
        },
    ))
}

/// Serial mode (N=0): no queues, no threads — the driver calls C3 and C2
/// inline on the calling thread (spec §5). The inspector accumulates the
/// same completed/partial counters and logs the same per-record events the
/// pipelined worker/inserter pair produces across Q2, so the two modes
/// report identical summaries and log streams for the same input tree.
fn run_serial(
    root_prefix: &std::path::Path,
    tree: &Arc<RwLock<SelectionTree>>,
    supported_mask: AttrMask,
    dry_run: bool,
    caps: Capabilities,
    logger: ScanLoggerHandle,
) -> Result<(TraversalStats, InsertionStats)> {
    let inspector = SerialInspector::new(Arc::clone(tree), caps, logger.clone());
    let abort = Arc::new(AtomicBool::new(false));
    let traversal_stats =
        traversal::run(root_prefix, tree, &inspector, supported_mask, dry_run, &logger, &abort)?;
    let insertion_stats = InsertionStats {
        records_completed: inspector.completed_count(),
        records_partial: inspector.partial_count(),
    };
    Ok((traversal_stats, insertion_stats))
}

/// Pipelined mode (N>0): spawns the tree inserter, then N extractor
/// workers, then runs the driver on the calling thread (spec §4.5
/// "Lifecycle").
#[allow(clippy::too_many_arguments)]
fn run_pipelined(
    root_prefix: &std::path::Path,
    tree: Arc<RwLock<SelectionTree>>,
    worker_count: usize,
    queue_capacity_factor: usize,
    supported_mask: AttrMask,
    dry_run: bool,
    caps: Capabilities,
    logger: ScanLoggerHandle,
) -> Result<(TraversalStats, InsertionStats)> {
    let capacity = queue_capacity_factor.max(1) * worker_count.max(1);
    let (q1_tx, q1_rx) = bounded::<InspectionRequest>(capacity);
    let (q2_tx, q2_rx) = bounded::<CompletedRecord>(capacity);
    let abort = Arc::new(AtomicBool::new(false));

    let inserter_handle = spawn_inserter(q2_rx, Arc::clone(&tree), logger.clone(), Arc::clone(&abort))?;

    let mut worker_handles = Vec::with_capacity(worker_count);
    for idx in 0..worker_count {
        worker_handles.push(spawn_worker(idx, q1_rx.clone(), q2_tx.clone(), caps, logger.clone())?);
    }
    // The driver is Q1's sole producer and the workers are Q1's only
    // consumers; drop our extra receiver/sender clones so channel closing
    // is driven purely by the driver (Q1) and the worker pool (Q2).
    drop(q1_rx);
    drop(q2_tx);

    let inspector = QueueInspector::new(q1_tx);
    let traversal_stats = traversal::run(root_prefix, &tree, &inspector, supported_mask, dry_run, &logger, &abort);
    // Closes Q1: the driver's sender is the only one and is dropped here.
    drop(inspector);

    for handle in worker_handles {
        if handle.join().is_err() {
            logger.send(ScanEvent::WorkerPanicked {
                details: "extractor worker thread panicked".to_string(),
            });
        }
    }

    let insertion_result = inserter_handle
        .join()
        .map_err(|_| ScanError::WorkerPanicked {
            details: "tree inserter thread panicked".to_string(),
        })?;

    let traversal_stats = traversal_stats?;
    let insertion_stats = insertion_result?;
    Ok((traversal_stats, insertion_stats))
}

fn spawn_worker(
    idx: usize,
    rx: Receiver<InspectionRequest>,
    tx: Sender<CompletedRecord>,
    caps: Capabilities,
    logger: ScanLoggerHandle,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("aide-scan-worker-{idx}"))
        .spawn(move || worker_main(&rx, &tx, caps, &logger))
        .map_err(|source| ScanError::WorkerPanicked {
            details: format!("failed to spawn extractor worker {idx}: {source}"),
        })
}

fn worker_main(
    rx: &Receiver<InspectionRequest>,
    tx: &Sender<CompletedRecord>,
    caps: Capabilities,
    logger: &ScanLoggerHandle,
) {
    while let Ok(request) = rx.recv() {
        let record = extract::extract(&request, caps);
        if record.is_partial() {
            logger.send(ScanEvent::EntryError {
                path: record.path.display().to_string(),
                error_code: "AIDE-2002".to_string(),
                error_message: "partial record: see reason field".to_string(),
            });
        }
        if tx.send(record).is_err() {
            break;
        }
    }
}

fn spawn_inserter(
    rx: Receiver<CompletedRecord>,
    tree: Arc<RwLock<SelectionTree>>,
    logger: ScanLoggerHandle,
    abort: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<Result<InsertionStats>>> {
    thread::Builder::new()
        .name("aide-scan-inserter".to_string())
        .spawn(move || inserter_main(&rx, &tree, &logger, &abort))
        .map_err(|source| ScanError::WorkerPanicked {
            details: format!("failed to spawn tree inserter: {source}"),
        })
}

/// The single tree-insertion consumer (spec §4.5). Keeps draining Q2 even
/// after a fatal structural error so worker threads blocked on a full Q2
/// never deadlock (spec §5: "no timeouts ... a single unresponsive file can
/// stall one worker but never deadlock the pipeline") — it just stops
/// calling `attach_record` once the first fatal error is observed and
/// surfaces that error once the queue fully drains.
fn inserter_main(
    rx: &Receiver<CompletedRecord>,
    tree: &Arc<RwLock<SelectionTree>>,
    logger: &ScanLoggerHandle,
    abort: &Arc<AtomicBool>,
) -> Result<InsertionStats> {
    let mut stats = InsertionStats::default();
    let mut fatal: Option<ScanError> = None;

    while let Ok(record) = rx.recv() {
        if fatal.is_some() {
            continue;
        }
        let path = record.path.clone();
        let is_partial = record.is_partial();
        match tree.write().attach_record(&path, record) {
            Ok(()) => {
                stats.records_completed += 1;
                if is_partial {
                    stats.records_partial += 1;
                }
                logger.send(ScanEvent::RecordCompleted {
                    path: path.display().to_string(),
                });
            }
            Err(error) if error.is_fatal() => {
                abort.store(true, Ordering::Relaxed);
                logger.send(ScanEvent::EntryError {
                    path: path.display().to_string(),
                    error_code: error.code().to_string(),
                    error_message: error.to_string(),
                });
                fatal = Some(error);
            }
            Err(error) => {
                logger.send(ScanEvent::EntryError {
                    path: path.display().to_string(),
                    error_code: error.code().to_string(),
                    error_message: error.to_string(),
                });
            }
        }
    }

    fatal.map_or(Ok(stats), Err)
}

// `Inspect` is re-exported so callers constructing their own inspector
// (e.g. a dry-run-only CLI path) don't need to reach into `crate::traversal`.
pub use traversal::Inspect as ScanInspect;
