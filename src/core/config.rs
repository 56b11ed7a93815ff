//! Configuration system: TOML file + env var overrides + smart defaults.
//!
//! The scan engine takes this as an explicit context value rather than a
//! process-wide singleton (design note §9 "Global configuration"), so two
//! scans can run side by side in one process and be tested in isolation.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ScanError};

/// Full scan-engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    pub scanner: ScannerConfig,
    pub digest: DigestConfig,
    pub capabilities: CapabilityConfig,
}

/// Scanner traversal and pipeline behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Absolute root prefix; all stored/classified paths are relative to this.
    pub root_prefix: PathBuf,
    /// Number of C3 extractor worker threads. 0 means serial mode (no queues/threads).
    pub worker_count: usize,
    /// Bounded queue capacity factor: Q1/Q2 capacity is `queue_capacity_factor * worker_count.max(1)`.
    pub queue_capacity_factor: usize,
    /// Dry-run: classify and log only, no inspection requests issued.
    pub dry_run: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            root_prefix: PathBuf::from("/"),
            worker_count: 4,
            queue_capacity_factor: 4,
            dry_run: false,
        }
    }
}

/// Which content-digest algorithms C3 computes in its single streaming pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DigestConfig {
    pub sha256: bool,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self { sha256: true }
    }
}

/// Capability flags gating the attribute groups that require a platform
/// facility beyond basic `stat`. Each is independently toggleable so a
/// platform lacking one (e.g. no SELinux) can still run the scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CapabilityConfig {
    pub xattrs: bool,
    pub acl: bool,
    pub selinux: bool,
    pub e2fsattrs: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            xattrs: true,
            acl: false,
            selinux: false,
            e2fsattrs: false,
        }
    }
}

impl ScanConfig {
    /// Default configuration file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from("/etc/aide-scan/config.toml")
    }

    /// Load config from an explicit path, the `AIDE_SCAN_CONFIG` env var, or
    /// the default path, then apply env var overrides.
    ///
    /// Missing config at the default path is not an error; defaults are used.
    /// A missing config at an explicitly requested path is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = if path.is_none() {
            env::var_os("AIDE_SCAN_CONFIG").map(PathBuf::from)
        } else {
            None
        };
        let is_explicit = path.is_some() || env_path.is_some();
        let effective_path = path.map_or_else(
            || env_path.clone().unwrap_or_else(Self::default_path),
            Path::to_path_buf,
        );

        let mut cfg = if effective_path.exists() {
            let raw = fs::read_to_string(&effective_path)
                .map_err(|source| ScanError::io(&effective_path, source))?;
            toml::from_str(&raw)?
        } else if is_explicit {
            return Err(ScanError::MissingConfig {
                path: effective_path,
            });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_pathbuf("AIDE_SCAN_ROOT", &mut self.scanner.root_prefix);
        set_env_usize("AIDE_SCAN_WORKERS", &mut self.scanner.worker_count)?;
        set_env_bool("AIDE_SCAN_DRY_RUN", &mut self.scanner.dry_run)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.scanner.root_prefix.is_absolute() {
            return Err(ScanError::InvalidConfig {
                details: format!(
                    "scanner.root_prefix must be absolute, got {}",
                    self.scanner.root_prefix.display()
                ),
            });
        }
        if self.scanner.queue_capacity_factor == 0 {
            return Err(ScanError::InvalidConfig {
                details: "scanner.queue_capacity_factor must be at least 1".to_string(),
            });
        }
        if !self.digest.sha256 {
            return Err(ScanError::InvalidConfig {
                details: "at least one digest algorithm must be enabled".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_pathbuf(name: &str, slot: &mut PathBuf) {
    if let Some(raw) = env_var(name) {
        *slot = PathBuf::from(raw);
    }
}

fn set_env_usize(name: &str, slot: &mut usize) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw
            .parse::<usize>()
            .map_err(|error| ScanError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}

fn set_env_bool(name: &str, slot: &mut bool) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<bool>().map_err(|error| ScanError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}
