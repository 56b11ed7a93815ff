//! AIDE-prefixed error types with structured error codes.
//!
//! Three kinds per the design's error model: transient per-entry failures
//! (logged, scan continues), structural failures (programming errors, scan
//! aborts), and resource failures (fatal, scan aborts). `is_retryable`
//! distinguishes the first kind from the latter two.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the crate.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Top-level error type for the scan engine.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("[AIDE-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[AIDE-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[AIDE-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[AIDE-1101] invalid rule: anchor {anchor}: {details}")]
    InvalidRule { anchor: String, details: String },

    #[error("[AIDE-2001] stat failure for {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[AIDE-2002] read failure for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[AIDE-2003] unreadable directory {path}: {source}")]
    DirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[AIDE-2004] path has invalid encoding: {path:?}")]
    InvalidPathEncoding { path: PathBuf },

    #[error("[AIDE-3001] duplicate record attach for {path}")]
    DuplicateAttach { path: PathBuf },

    #[error("[AIDE-3002] rule installed after scan start for anchor {anchor}")]
    RuleInstalledAfterStart { anchor: String },

    #[error("[AIDE-3101] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[AIDE-3102] worker thread panicked: {details}")]
    WorkerPanicked { details: String },

    #[error("[AIDE-3900] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[AIDE-3901] out of memory during extraction for {path}")]
    OutOfMemory { path: PathBuf },
}

impl ScanError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "AIDE-1001",
            Self::MissingConfig { .. } => "AIDE-1002",
            Self::ConfigParse { .. } => "AIDE-1003",
            Self::InvalidRule { .. } => "AIDE-1101",
            Self::Stat { .. } => "AIDE-2001",
            Self::Io { .. } => "AIDE-2002",
            Self::DirUnreadable { .. } => "AIDE-2003",
            Self::InvalidPathEncoding { .. } => "AIDE-2004",
            Self::DuplicateAttach { .. } => "AIDE-3001",
            Self::RuleInstalledAfterStart { .. } => "AIDE-3002",
            Self::ChannelClosed { .. } => "AIDE-3101",
            Self::WorkerPanicked { .. } => "AIDE-3102",
            Self::Serialization { .. } => "AIDE-3900",
            Self::OutOfMemory { .. } => "AIDE-3901",
        }
    }

    /// Whether the failure is transient (per-entry, §7 kind 1) rather than
    /// structural or resource-exhaustion (kinds 2/3, which abort the scan).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Stat { .. } | Self::Io { .. } | Self::DirUnreadable { .. }
        )
    }

    /// Whether this error is fatal to the scan (structural or resource, §7 kinds 2/3).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAttach { .. }
                | Self::RuleInstalledAfterStart { .. }
                | Self::OutOfMemory { .. }
                | Self::WorkerPanicked { .. }
        )
    }

    #[must_use]
    pub fn stat(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<regex::Error> for ScanError {
    fn from(value: regex::Error) -> Self {
        Self::InvalidRule {
            anchor: String::new(),
            details: value.to_string(),
        }
    }
}
