//! Rule and attribute-mask types (spec §3 "Rule").
//!
//! A rule pairs a compiled regex (matched against paths relative to the
//! rule's own anchor) with a kind that determines how a match is interpreted
//! during classification, plus the attribute groups it requests from C3 and
//! an optional restriction on which entry kinds it applies to.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::core::errors::{Result, ScanError};

/// What kind of filesystem entry a rule (or a captured raw-metadata record)
/// describes. Symlinks are a distinct kind — they are never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

impl EntryKind {
    #[must_use]
    pub fn from_raw(is_dir: bool, is_symlink: bool, is_file: bool) -> Self {
        if is_symlink {
            Self::Symlink
        } else if is_dir {
            Self::Dir
        } else if is_file {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Bitset of restricted entry kinds a rule applies to. Empty means "any kind".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryKindMask(u8);

impl EntryKindMask {
    pub const FILE: Self = Self(1 << 0);
    pub const DIR: Self = Self(1 << 1);
    pub const SYMLINK: Self = Self(1 << 2);
    pub const OTHER: Self = Self(1 << 3);
    pub const ANY: Self = Self(0);

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn permits(self, kind: EntryKind) -> bool {
        if self.0 == 0 {
            return true;
        }
        let bit = match kind {
            EntryKind::File => Self::FILE.0,
            EntryKind::Dir => Self::DIR.0,
            EntryKind::Symlink => Self::SYMLINK.0,
            EntryKind::Other => Self::OTHER.0,
        };
        self.0 & bit != 0
    }
}

/// Bitset of attribute groups a rule requests, mirroring AIDE's R/L/>/H/X/E
/// groups (permissions, ownership, size, timestamps, identity, content
/// digests, extended attributes, and the capability-gated extras).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrMask(u32);

impl AttrMask {
    pub const PERMS: Self = Self(1 << 0);
    pub const OWNER: Self = Self(1 << 1);
    pub const SIZE: Self = Self(1 << 2);
    pub const TIMESTAMPS: Self = Self(1 << 3);
    pub const INODE: Self = Self(1 << 4);
    pub const LINK_COUNT: Self = Self(1 << 5);
    pub const SHA256: Self = Self(1 << 6);
    pub const XATTRS: Self = Self(1 << 7);
    pub const ACL: Self = Self(1 << 8);
    pub const SELINUX: Self = Self(1 << 9);
    pub const E2FSATTRS: Self = Self(1 << 10);
    pub const NONE: Self = Self(0);

    pub const METADATA_ONLY: Self = Self(
        Self::PERMS.0 | Self::OWNER.0 | Self::SIZE.0 | Self::TIMESTAMPS.0 | Self::INODE.0 | Self::LINK_COUNT.0,
    );

    pub const ALL: Self = Self(
        Self::PERMS.0
            | Self::OWNER.0
            | Self::SIZE.0
            | Self::TIMESTAMPS.0
            | Self::INODE.0
            | Self::LINK_COUNT.0
            | Self::SHA256.0
            | Self::XATTRS.0
            | Self::ACL.0
            | Self::SELINUX.0
            | Self::E2FSATTRS.0,
    );

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// What a matched rule implies for classification (spec §3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Positive, recursive: matches itself and (via its own regex) descendants.
    Selective,
    /// Positive, exact: matches only the precise path, no recursive implication.
    Equal,
    /// Exclude: a match here always yields `NO_MATCH`, overriding positive rules.
    Negative,
    /// Confines positive rules at or below this anchor to a reachable subset.
    Limit,
}

/// A single compiled rule: anchor, regex (relative to the anchor), kind,
/// requested attribute groups, and an optional entry-kind restriction.
#[derive(Debug, Clone)]
pub struct Rule {
    pub anchor: PathBuf,
    pub pattern: String,
    pub regex: Regex,
    pub kind: RuleKind,
    pub attr_mask: AttrMask,
    pub file_types: EntryKindMask,
}

impl Rule {
    pub fn new(
        anchor: impl AsRef<Path>,
        pattern: impl Into<String>,
        kind: RuleKind,
        attr_mask: AttrMask,
        file_types: EntryKindMask,
    ) -> Result<Self> {
        let anchor = anchor.as_ref().to_path_buf();
        let pattern = pattern.into();
        let regex = Regex::new(&pattern).map_err(|source| ScanError::InvalidRule {
            anchor: anchor.display().to_string(),
            details: source.to_string(),
        })?;
        Ok(Self {
            anchor,
            pattern,
            regex,
            kind,
            attr_mask,
            file_types,
        })
    }

    /// Whether this rule is eligible to be evaluated against `entry_kind` at all.
    #[must_use]
    pub fn applies_to(&self, entry_kind: EntryKind) -> bool {
        self.file_types.permits(entry_kind)
    }
}
