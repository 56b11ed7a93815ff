//! Non-blocking scan event logger.
//!
//! Architecture: a dedicated logger thread owns the `JsonlWriter`. All other
//! threads (the C4 traversal driver and the C3 worker pool) send `ScanEvent`
//! via a bounded crossbeam channel. Non-blocking `try_send()` ensures a
//! worker is never blocked by logging back-pressure — a slow or degraded
//! sink costs dropped log lines, not throughput.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{Result, ScanError};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 1024;

/// Events emitted during a scan run.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    ScanStarted {
        root_prefix: String,
    },
    ScanCompleted {
        entries_inspected: u64,
        records_completed: u64,
        duration_ms: u64,
    },
    /// Transient per-entry failure (stat/read/decode) — scan continues (§7 kind 1).
    EntryError {
        path: String,
        error_code: String,
        error_message: String,
    },
    /// A directory could not be opened for reading; its subtree is skipped.
    DirUnreadable {
        path: String,
        error_message: String,
    },
    RecordCompleted {
        path: String,
    },
    RulesLoaded {
        count: usize,
    },
    WorkerPanicked {
        details: String,
    },
    /// Dry-run diagnostic (§4.4): the classification for one path, emitted
    /// instead of an inspection request.
    DryRunClassification {
        path: String,
        rule_pattern: Option<String>,
        result: String,
    },
    /// Sentinel requesting graceful shutdown of the logger thread.
    Shutdown,
}

/// Thread-safe, cheaply-cloneable handle for sending scan events.
///
/// Internally wraps a bounded crossbeam `Sender`. `send()` uses `try_send()`
/// so callers are never blocked by logging back-pressure.
#[derive(Clone)]
pub struct ScanLoggerHandle {
    tx: Sender<ScanEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ScanLoggerHandle {
    /// Send an event to the logger thread. Non-blocking.
    ///
    /// If the channel is full the event is dropped and the dropped-events
    /// counter is incremented; the logger thread reports the count on its
    /// next cycle.
    pub fn send(&self, event: ScanEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of events dropped due to channel back-pressure.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown of the logger thread.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ScanEvent::Shutdown);
    }
}

/// Options for building the scan logger.
pub struct ScanLoggerConfig {
    /// JSONL writer config.
    pub jsonl_config: JsonlConfig,
    /// Bounded channel capacity.
    pub channel_capacity: usize,
}

impl Default for ScanLoggerConfig {
    fn default() -> Self {
        Self {
            jsonl_config: JsonlConfig::default(),
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Spawn the logger thread and return a handle.
///
/// The returned handle is `Clone + Send` and can be shared across worker
/// threads. The logger thread runs until `handle.shutdown()` is called or
/// all senders are dropped.
pub fn spawn_logger(
    config: ScanLoggerConfig,
) -> Result<(ScanLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ScanEvent>(config.channel_capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ScanLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("aide-scan-logger".to_string())
        .spawn(move || {
            logger_thread_main(rx, config.jsonl_config, dropped_clone);
        })
        .map_err(|e| ScanError::WorkerPanicked {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: Receiver<ScanEvent>, jsonl_config: JsonlConfig, dropped: Arc<AtomicU64>) {
    let mut jsonl = JsonlWriter::open(jsonl_config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::EntryError, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ScanEvent::Shutdown) {
            jsonl.flush();
            jsonl.fsync();
            break;
        }

        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.flush();
    jsonl.fsync();
}

fn event_to_log_entry(event: &ScanEvent) -> LogEntry {
    match event {
        ScanEvent::ScanStarted { root_prefix } => {
            let mut e = LogEntry::new(EventType::ScanStarted, Severity::Info);
            e.details = Some(format!("root_prefix={root_prefix}"));
            e
        }
        ScanEvent::ScanCompleted {
            entries_inspected,
            records_completed,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::ScanCompleted, Severity::Info);
            e.entries_inspected = Some(*entries_inspected);
            e.records_completed = Some(*records_completed);
            e.duration_ms = Some(*duration_ms);
            e
        }
        ScanEvent::EntryError {
            path,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::EntryError, Severity::Warning);
            e.path = Some(path.clone());
            e.error_code = Some(error_code.clone());
            e.error_message = Some(error_message.clone());
            e
        }
        ScanEvent::DirUnreadable {
            path,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::DirUnreadable, Severity::Warning);
            e.path = Some(path.clone());
            e.error_message = Some(error_message.clone());
            e
        }
        ScanEvent::RecordCompleted { path } => {
            let mut e = LogEntry::new(EventType::RecordCompleted, Severity::Info);
            e.path = Some(path.clone());
            e
        }
        ScanEvent::RulesLoaded { count } => {
            let mut e = LogEntry::new(EventType::RulesLoaded, Severity::Info);
            e.details = Some(format!("rules={count}"));
            e
        }
        ScanEvent::WorkerPanicked { details } => {
            let mut e = LogEntry::new(EventType::WorkerPanicked, Severity::Critical);
            e.details = Some(details.clone());
            e
        }
        ScanEvent::DryRunClassification {
            path,
            rule_pattern,
            result,
        } => {
            let mut e = LogEntry::new(EventType::DryRunClassification, Severity::Info);
            e.path = Some(path.clone());
            e.details = Some(match rule_pattern {
                Some(pattern) => format!("result={result} rule={pattern}"),
                None => format!("result={result} rule=<none>"),
            });
            e
        }
        ScanEvent::Shutdown => LogEntry::new(EventType::ScanCompleted, Severity::Info),
    }
}
