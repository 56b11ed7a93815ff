//! Raw-metadata capture and extended-attribute access.
//!
//! C4 performs one `lstat`-equivalent syscall per visited entry and hands the
//! result to C3 for attribute-group extraction; this module is that single
//! syscall plus the capability-gated extras (xattrs, ACLs, security labels,
//! filesystem flags) C3 reads when a rule requests them.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::core::errors::{Result, ScanError};

/// Raw per-entry metadata captured by a single `lstat`-equivalent call.
///
/// Symlinks are never followed — `symlink_metadata` reports the link itself,
/// matching the spec's requirement that traversal decisions never dereference
/// a symlink target.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMetadata {
    pub size_bytes: u64,
    pub modified: SystemTime,
    pub accessed: Option<SystemTime>,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub is_file: bool,
    pub inode: u64,
    pub device_id: u64,
    pub link_count: u64,
    pub permissions: u32,
    pub uid: u32,
    pub gid: u32,
}

/// Capture raw metadata for `path` without following a trailing symlink.
pub fn lstat(path: &Path) -> Result<RawMetadata> {
    let meta = fs::symlink_metadata(path).map_err(|source| ScanError::stat(path, source))?;
    Ok(raw_metadata_from(&meta))
}

#[cfg(unix)]
fn raw_metadata_from(meta: &fs::Metadata) -> RawMetadata {
    use std::os::unix::fs::MetadataExt;
    RawMetadata {
        size_bytes: meta.len(),
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        accessed: meta.accessed().ok(),
        is_dir: meta.is_dir(),
        is_symlink: meta.is_symlink(),
        is_file: meta.is_file(),
        inode: meta.ino(),
        device_id: meta.dev(),
        link_count: meta.nlink(),
        permissions: meta.mode(),
        uid: meta.uid(),
        gid: meta.gid(),
    }
}

#[cfg(not(unix))]
fn raw_metadata_from(meta: &fs::Metadata) -> RawMetadata {
    RawMetadata {
        size_bytes: meta.len(),
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        accessed: meta.accessed().ok(),
        is_dir: meta.is_dir(),
        is_symlink: meta.is_symlink(),
        is_file: meta.is_file(),
        inode: 0,
        device_id: 0,
        link_count: 0,
        permissions: 0,
        uid: 0,
        gid: 0,
    }
}

/// A single extended attribute: name plus raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedAttribute {
    pub name: String,
    pub value: Vec<u8>,
}

/// Read all extended attributes of `path`, not following a trailing symlink.
///
/// Returns an empty list (not an error) on platforms or filesystems where
/// extended attributes are unsupported — a rule that requests the `X`
/// attribute group on such a filesystem simply records nothing, per the
/// capability-flag contract.
#[cfg(unix)]
pub fn read_xattrs(path: &Path) -> Result<Vec<ExtendedAttribute>> {
    let names = match xattr::list(path) {
        Ok(names) => names,
        Err(error) if is_unsupported(&error) => return Ok(Vec::new()),
        Err(source) => return Err(ScanError::io(path, source)),
    };

    let mut attrs = Vec::new();
    for name in names {
        let Some(value) = xattr::get(path, &name).map_err(|source| ScanError::io(path, source))?
        else {
            continue;
        };
        attrs.push(ExtendedAttribute {
            name: name.to_string_lossy().into_owned(),
            value,
        });
    }
    attrs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(attrs)
}

#[cfg(not(unix))]
pub fn read_xattrs(_path: &Path) -> Result<Vec<ExtendedAttribute>> {
    Ok(Vec::new())
}

#[cfg(unix)]
fn is_unsupported(error: &std::io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(libc::ENOTSUP) | Some(libc::EOPNOTSUPP)
    )
}

/// POSIX ACL entries for a path. Stubbed: no crate in the corpus provides a
/// portable ACL reader, so this returns `None` (capability unavailable)
/// rather than inventing a raw `acl_get_file`-style FFI surface.
pub fn read_acl(_path: &Path) -> Result<Option<Vec<u8>>> {
    Ok(None)
}

/// SELinux security context label for a path. Stubbed for the same reason
/// as [`read_acl`] — wired behind the capability flag, not implemented.
pub fn read_selinux_label(_path: &Path) -> Result<Option<String>> {
    Ok(None)
}

/// Extended filesystem attribute flags (`lsattr`/`chattr`, e.g. immutable,
/// append-only). Stubbed for the same reason as [`read_acl`].
pub fn read_e2fsattrs(_path: &Path) -> Result<Option<u32>> {
    Ok(None)
}
