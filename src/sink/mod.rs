//! Completed-record sinks (spec SPEC_FULL §[SUPPLEMENT] E).
//!
//! The on-disk database back-end is an explicit external collaborator
//! (spec §1, §6): the core only ever hands it completed records. The
//! [`SelectionTree`](crate::tree::SelectionTree) itself *is* that hand-off
//! point for the in-memory result (spec §4.5's tree-insertion consumer
//! writes directly into it). This module adds one additional, optional
//! sink — [`JsonlSink`] — so a caller without a real database back-end can
//! still get a durable artifact out of a scan, without this crate
//! pretending to implement AIDE's compressed on-disk format.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::{Result, ScanError};
use crate::record::CompletedRecord;
use crate::rules::rule::EntryKind;

/// Something that accepts completed records as they are produced.
///
/// This is the seam where an external database writer (out of scope per
/// spec §1) would plug in; the scan engine itself only ever needs the
/// [`crate::tree::SelectionTree`]'s own `attach_record`, which every
/// pipeline mode already uses directly.
pub trait ScanSink {
    /// Accept one completed record. Implementations should not block for
    /// long — a slow sink should buffer internally rather than stall the
    /// caller (mirrors the non-blocking discipline of `ScanLoggerHandle`).
    fn accept(&mut self, record: &CompletedRecord) -> Result<()>;
}

/// A serializable, order-stable projection of a [`CompletedRecord`] for
/// JSONL output. Digest bytes are rendered as lowercase hex so the file is
/// diffable with ordinary text tools.
#[derive(Debug, Serialize)]
struct JsonlRecord {
    path: String,
    entry_kind: &'static str,
    size_bytes: Option<u64>,
    permissions: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    sha256: Option<String>,
    link_target: Option<String>,
    partial: bool,
}

impl From<&CompletedRecord> for JsonlRecord {
    fn from(record: &CompletedRecord) -> Self {
        Self {
            path: record.path.display().to_string(),
            entry_kind: match record.entry_kind {
                EntryKind::File => "file",
                EntryKind::Dir => "dir",
                EntryKind::Symlink => "symlink",
                EntryKind::Other => "other",
            },
            size_bytes: record.attrs.size_bytes,
            permissions: record.attrs.permissions,
            uid: record.attrs.uid,
            gid: record.attrs.gid,
            sha256: record.digests.sha256.map(hex::encode),
            link_target: record
                .link_target
                .as_ref()
                .map(|p| p.display().to_string()),
            partial: record.is_partial(),
        }
    }
}

/// Minimal hex-encoding helper — avoids pulling in a dedicated hex crate
/// for the one call site that needs it.
mod hex {
    pub fn encode(bytes: [u8; 32]) -> String {
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

/// Appends completed records as newline-delimited JSON. Not a persisted
/// database format — a convenience artifact (spec SPEC_FULL §E).
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Open (creating if necessary) `path` for append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ScanError::io(&path, source))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScanSink for JsonlSink {
    fn accept(&mut self, record: &CompletedRecord) -> Result<()> {
        let projected = JsonlRecord::from(record);
        let line = serde_json::to_string(&projected)?;
        writeln!(self.writer, "{line}").map_err(|source| ScanError::io(&self.path, source))?;
        self.writer
            .flush()
            .map_err(|source| ScanError::io(&self.path, source))
    }
}
