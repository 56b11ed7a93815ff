//! C3: attribute extractor.
//!
//! Given a path, the desired attribute mask, and the raw metadata already
//! captured by the traversal driver (spec §4.3: "the raw metadata must
//! already be captured by the caller ... so the extractor does not re-stat
//! for basic fields"), produces a [`CompletedRecord`]. Content digests are
//! streamed through a single pass with a thread-local, reused buffer (spec
//! §5 "Shared resources").

use std::cell::RefCell;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::core::errors::ScanError;
use crate::platform::pal::{self, RawMetadata};
use crate::record::{CompletedRecord, Digests, MetadataAttributes, PartialReason};
use crate::rules::rule::{AttrMask, EntryKind};

/// Streaming read buffer size, reused across requests by each worker thread
/// (spec §5: "per-worker hashing contexts and read buffers are thread-local
/// and reused across requests to avoid per-file allocation").
const READ_BUFFER_SIZE: usize = 64 * 1024;

thread_local! {
    static READ_BUFFER: RefCell<Vec<u8>> = RefCell::new(vec![0u8; READ_BUFFER_SIZE]);
}

/// Capability flags gating the attribute groups that require a platform
/// facility beyond basic `stat` (spec §4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub xattrs: bool,
    pub acl: bool,
    pub selinux: bool,
    pub e2fsattrs: bool,
}

/// One inspection request handed from C4 to a C3 worker through Q1 (spec
/// §4.5): the path, the effective attribute mask, and the metadata C4
/// already captured for the classification decision.
#[derive(Debug, Clone)]
pub struct InspectionRequest {
    pub absolute_path: std::path::PathBuf,
    pub tree_path: std::path::PathBuf,
    pub entry_kind: EntryKind,
    pub attr_mask: AttrMask,
    pub raw: RawMetadata,
}

/// Extract a completed record for one inspection request.
///
/// I/O failures while opening or reading content produce a *partial* record
/// (spec §4.3 "Failure semantics") rather than an error — the record still
/// flows onward so the comparison layer can surface "changed/unreadable".
#[must_use]
pub fn extract(request: &InspectionRequest, caps: Capabilities) -> CompletedRecord {
    let effective = request.attr_mask.intersect(AttrMask::ALL);
    let mut record = CompletedRecord::new(
        request.tree_path.clone(),
        request.entry_kind,
        effective,
    );

    populate_metadata(&mut record, &request.raw, effective);

    match request.entry_kind {
        EntryKind::Symlink => {
            record.link_target = std::fs::read_link(&request.absolute_path).ok();
        }
        EntryKind::File => {
            if effective.contains(AttrMask::SHA256) {
                populate_digests(&mut record, &request.absolute_path);
            }
        }
        EntryKind::Dir | EntryKind::Other => {
            // Content digests never apply to directories, devices, sockets, or fifos.
        }
    }

    if effective.contains(AttrMask::XATTRS) && caps.xattrs {
        populate_xattrs(&mut record, &request.absolute_path);
    }
    if effective.contains(AttrMask::ACL) && caps.acl {
        populate_acl(&mut record, &request.absolute_path);
    }
    if effective.contains(AttrMask::SELINUX) && caps.selinux {
        populate_selinux_label(&mut record, &request.absolute_path);
    }
    if effective.contains(AttrMask::E2FSATTRS) && caps.e2fsattrs {
        populate_e2fsattrs(&mut record, &request.absolute_path);
    }

    record
}

fn populate_metadata(record: &mut CompletedRecord, raw: &RawMetadata, mask: AttrMask) {
    let attrs = &mut record.attrs;
    if mask.contains(AttrMask::PERMS) {
        attrs.permissions = Some(raw.permissions);
    }
    if mask.contains(AttrMask::OWNER) {
        attrs.uid = Some(raw.uid);
        attrs.gid = Some(raw.gid);
    }
    if mask.contains(AttrMask::SIZE) {
        attrs.size_bytes = Some(raw.size_bytes);
    }
    if mask.contains(AttrMask::TIMESTAMPS) {
        attrs.modified = Some(raw.modified);
        attrs.accessed = raw.accessed;
    }
    if mask.contains(AttrMask::INODE) {
        attrs.inode = Some(raw.inode);
        attrs.device_id = Some(raw.device_id);
    }
    if mask.contains(AttrMask::LINK_COUNT) {
        attrs.link_count = Some(raw.link_count);
    }
}

fn populate_digests(record: &mut CompletedRecord, path: &Path) {
    match hash_file(path) {
        Ok(digests) => record.digests = digests,
        Err(error) => {
            record.partial = Some(PartialReason::ContentUnreadable {
                details: error.to_string(),
            });
        }
    }
}

/// Stream `path`'s content through every requested digest algorithm in a
/// single pass, reusing the thread-local read buffer (spec §4.3, §5).
fn hash_file(path: &Path) -> Result<Digests, ScanError> {
    let mut file = File::open(path).map_err(|source| ScanError::io(path, source))?;
    let mut sha256 = Sha256::new();

    READ_BUFFER.with(|buffer| -> Result<(), ScanError> {
        let mut buffer = buffer.borrow_mut();
        loop {
            let n = file
                .read(&mut buffer)
                .map_err(|source| ScanError::io(path, source))?;
            if n == 0 {
                break;
            }
            sha256.update(&buffer[..n]);
        }
        Ok(())
    })?;

    Ok(Digests {
        sha256: Some(sha256.finalize().into()),
    })
}

fn populate_xattrs(record: &mut CompletedRecord, path: &Path) {
    match pal::read_xattrs(path) {
        Ok(attrs) => {
            record.xattrs = attrs.into_iter().map(|a| (a.name, a.value)).collect();
        }
        Err(error) => {
            record.partial = Some(PartialReason::XattrsUnreadable {
                details: error.to_string(),
            });
        }
    }
}

fn populate_acl(record: &mut CompletedRecord, path: &Path) {
    match pal::read_acl(path) {
        Ok(acl) => record.attrs.acl = acl,
        Err(error) => {
            record.partial = Some(PartialReason::AclUnreadable {
                details: error.to_string(),
            });
        }
    }
}

fn populate_selinux_label(record: &mut CompletedRecord, path: &Path) {
    match pal::read_selinux_label(path) {
        Ok(label) => record.attrs.selinux_label = label,
        Err(error) => {
            record.partial = Some(PartialReason::SelinuxUnreadable {
                details: error.to_string(),
            });
        }
    }
}

fn populate_e2fsattrs(record: &mut CompletedRecord, path: &Path) {
    match pal::read_e2fsattrs(path) {
        Ok(flags) => record.attrs.e2fsattrs = flags,
        Err(error) => {
            record.partial = Some(PartialReason::E2fsattrsUnreadable {
                details: error.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn raw_for(path: &Path) -> RawMetadata {
        pal::lstat(path).unwrap()
    }

    #[test]
    fn file_digest_is_populated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hello").unwrap();

        let request = InspectionRequest {
            absolute_path: path.clone(),
            tree_path: std::path::PathBuf::from("a.txt"),
            entry_kind: EntryKind::File,
            attr_mask: AttrMask::ALL,
            raw: raw_for(&path),
        };
        let record = extract(&request, Capabilities::default());
        assert!(record.digests.sha256.is_some());
        assert!(!record.is_partial());
    }

    #[test]
    fn symlink_clears_digests_and_captures_target() {
        #[cfg(unix)]
        {
            let dir = tempfile::tempdir().unwrap();
            let target = dir.path().join("target.txt");
            std::fs::File::create(&target).unwrap().write_all(b"x").unwrap();
            let link = dir.path().join("link");
            std::os::unix::fs::symlink(&target, &link).unwrap();

            let request = InspectionRequest {
                absolute_path: link.clone(),
                tree_path: std::path::PathBuf::from("link"),
                entry_kind: EntryKind::Symlink,
                attr_mask: AttrMask::ALL,
                raw: raw_for(&link),
            };
            let record = extract(&request, Capabilities::default());
            assert!(record.digests.is_empty());
            assert_eq!(record.link_target, Some(target));
        }
    }

    #[test]
    fn directory_has_no_digests() {
        let dir = tempfile::tempdir().unwrap();
        let request = InspectionRequest {
            absolute_path: dir.path().to_path_buf(),
            tree_path: std::path::PathBuf::from("d"),
            entry_kind: EntryKind::Dir,
            attr_mask: AttrMask::ALL,
            raw: raw_for(dir.path()),
        };
        let record = extract(&request, Capabilities::default());
        assert!(record.digests.is_empty());
    }

    #[test]
    fn unreadable_file_yields_partial_record_with_metadata_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::File::create(&path).unwrap().write_all(b"x").unwrap();
        let mut raw = raw_for(&path);
        // Simulate content becoming unreadable mid-scan: the file is removed
        // after metadata capture but before the extractor opens it.
        std::fs::remove_file(&path).unwrap();
        raw.size_bytes = 1;

        let request = InspectionRequest {
            absolute_path: path,
            tree_path: std::path::PathBuf::from("gone.txt"),
            entry_kind: EntryKind::File,
            attr_mask: AttrMask::ALL,
            raw,
        };
        let record = extract(&request, Capabilities::default());
        assert!(record.is_partial());
        assert_eq!(record.attrs.size_bytes, Some(1));
    }

    #[test]
    fn attr_mask_restricts_populated_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hi").unwrap();

        let request = InspectionRequest {
            absolute_path: path.clone(),
            tree_path: std::path::PathBuf::from("a.txt"),
            entry_kind: EntryKind::File,
            attr_mask: AttrMask::SIZE,
            raw: raw_for(&path),
        };
        let record = extract(&request, Capabilities::default());
        assert!(record.attrs.size_bytes.is_some());
        assert!(record.attrs.permissions.is_none());
        assert!(record.digests.is_empty());
    }

    #[test]
    fn acl_selinux_e2fsattrs_stay_unset_without_the_capability_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hi").unwrap();

        let request = InspectionRequest {
            absolute_path: path.clone(),
            tree_path: std::path::PathBuf::from("a.txt"),
            entry_kind: EntryKind::File,
            attr_mask: AttrMask::ALL,
            raw: raw_for(&path),
        };
        let record = extract(&request, Capabilities::default());
        assert!(record.attrs.acl.is_none());
        assert!(record.attrs.selinux_label.is_none());
        assert!(record.attrs.e2fsattrs.is_none());
        assert!(!record.is_partial());
    }

    #[test]
    fn acl_selinux_e2fsattrs_are_requested_when_capability_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hi").unwrap();

        let request = InspectionRequest {
            absolute_path: path.clone(),
            tree_path: std::path::PathBuf::from("a.txt"),
            entry_kind: EntryKind::File,
            attr_mask: AttrMask::ALL,
            raw: raw_for(&path),
        };
        let caps = Capabilities {
            xattrs: false,
            acl: true,
            selinux: true,
            e2fsattrs: true,
        };
        let record = extract(&request, caps);
        // `pal::read_acl`/`read_selinux_label`/`read_e2fsattrs` are stubbed to
        // `Ok(None)` (no portable binding in the corpus), so enabling the
        // capability flag still yields `None` fields rather than an error.
        assert!(!record.is_partial());
        assert!(record.attrs.acl.is_none());
        assert!(record.attrs.selinux_label.is_none());
        assert!(record.attrs.e2fsattrs.is_none());
    }
}
