//! Completed record (spec §3 "Completed record").
//!
//! An immutable per-path aggregate produced once by C3 and never mutated
//! afterward — it travels by value through Q2 to the tree-insertion
//! consumer, which is the only thing that ever attaches it to a node.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::rules::rule::{AttrMask, EntryKind};

/// Why a record is missing one of its requested attribute groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialReason {
    /// Opening or reading file content failed.
    ContentUnreadable { details: String },
    /// Extended attributes could not be read.
    XattrsUnreadable { details: String },
    /// POSIX ACL entries could not be read.
    AclUnreadable { details: String },
    /// SELinux security context label could not be read.
    SelinuxUnreadable { details: String },
    /// Extended filesystem attribute flags could not be read.
    E2fsattrsUnreadable { details: String },
    /// Path bytes were not valid for the platform's path encoding.
    InvalidEncoding,
}

/// Metadata attribute fields, populated only for the bits requested in the
/// effective `attr_mask` (spec §4.3: "exactly the attributes in `attr_mask`
/// intersected with `supported_attributes`").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataAttributes {
    pub permissions: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size_bytes: Option<u64>,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub inode: Option<u64>,
    pub device_id: Option<u64>,
    pub link_count: Option<u64>,
    /// POSIX ACL entries, when requested and the platform capability is
    /// enabled. Stays `None` on targets without a portable ACL reader.
    pub acl: Option<Vec<u8>>,
    /// SELinux security context label, when requested and enabled.
    pub selinux_label: Option<String>,
    /// Extended filesystem attribute flags (`lsattr`/`chattr`), when
    /// requested and enabled.
    pub e2fsattrs: Option<u32>,
}

/// Content digests, one per requested algorithm. Cleared entirely for
/// symlinks and for non-regular, non-symlink entries (spec §4.3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digests {
    pub sha256: Option<[u8; 32]>,
}

impl Digests {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sha256.is_none()
    }
}

/// An immutable per-path aggregate of extracted attributes and digests
/// (spec §3 "Completed record").
///
/// Once produced by C3 a record is never mutated; invariant 3 of §3 says a
/// record is in exactly one of: in flight in Q2, attached to a tree node, or
/// dropped with an error reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRecord {
    pub path: PathBuf,
    pub entry_kind: EntryKind,
    pub attrs: MetadataAttributes,
    pub digests: Digests,
    pub link_target: Option<PathBuf>,
    pub xattrs: Vec<(String, Vec<u8>)>,
    pub attr_mask: AttrMask,
    /// Set when one or more requested attribute groups could not be
    /// extracted; the record still flows to C2 (spec §4.3 "Failure
    /// semantics") so the comparison layer can surface "changed/unreadable".
    pub partial: Option<PartialReason>,
}

impl CompletedRecord {
    #[must_use]
    pub fn new(path: PathBuf, entry_kind: EntryKind, attr_mask: AttrMask) -> Self {
        Self {
            path,
            entry_kind,
            attrs: MetadataAttributes::default(),
            digests: Digests::default(),
            link_target: None,
            xattrs: Vec::new(),
            attr_mask,
            partial: None,
        }
    }

    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial.is_some()
    }

    /// File name of `path`, used by the tree inserter to locate/allocate the
    /// matching node under its parent.
    #[must_use]
    pub fn file_name_lossy(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_not_partial() {
        let record = CompletedRecord::new(PathBuf::from("/r/a"), EntryKind::File, AttrMask::ALL);
        assert!(!record.is_partial());
    }

    #[test]
    fn digests_empty_when_no_algorithm_set() {
        let digests = Digests::default();
        assert!(digests.is_empty());
    }
}
