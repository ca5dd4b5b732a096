//! Cross-platform filesystem helpers.
//!
//! On Unix the permission bits, ownership and device numbers come straight
//! from `std::os::unix::fs::MetadataExt`. Other platforms have no such
//! notion, so entries get conventional defaults (0o755 for directories,
//! 0o644 otherwise) and zero ownership.

use crate::common::EntryKind;
use crate::error::{PackError, Result};
use std::fs::{File, Metadata, OpenOptions};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Open `path` as a fresh snapshot destination.
///
/// The file is created exclusively (mode 0600 on Unix). An existing empty
/// file is accepted and reused; an existing file with content is refused so
/// an earlier snapshot is never overwritten by accident.
pub fn open_destination(path: &Path) -> Result<File> {
    let mut create = OpenOptions::new();
    create.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        create.mode(0o600);
    }

    match create.open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let existing = std::fs::metadata(path).map_err(|e| PackError::Destination {
                source: e,
                path: path.to_path_buf(),
            })?;
            if existing.len() > 0 {
                return Err(PackError::DestinationNotEmpty {
                    path: path.to_path_buf(),
                    size: existing.len(),
                });
            }
            OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|e| PackError::Destination {
                    source: e,
                    path: path.to_path_buf(),
                })
        }
        Err(e) => Err(PackError::Destination {
            source: e,
            path: path.to_path_buf(),
        }),
    }
}

/// Classify an `lstat` result without following symlinks.
pub fn entry_kind(metadata: &Metadata) -> EntryKind {
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        return EntryKind::Symlink;
    }
    if file_type.is_dir() {
        return EntryKind::Directory;
    }
    if file_type.is_file() {
        return EntryKind::Regular;
    }
    special_kind(&file_type)
}

#[cfg(unix)]
fn special_kind(file_type: &std::fs::FileType) -> EntryKind {
    use std::os::unix::fs::FileTypeExt;
    if file_type.is_char_device() {
        EntryKind::CharDevice
    } else if file_type.is_block_device() {
        EntryKind::BlockDevice
    } else if file_type.is_fifo() {
        EntryKind::Fifo
    } else {
        EntryKind::Socket
    }
}

#[cfg(not(unix))]
fn special_kind(_file_type: &std::fs::FileType) -> EntryKind {
    // Windows only reports files, directories and symlinks.
    EntryKind::Regular
}

/// Permission bits, setuid/setgid/sticky included.
#[cfg(unix)]
pub fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.is_dir() {
        0o755
    } else if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// `(uid, gid)` of the object.
#[cfg(unix)]
pub fn ownership(metadata: &Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (u64::from(metadata.uid()), u64::from(metadata.gid()))
}

#[cfg(not(unix))]
pub fn ownership(_metadata: &Metadata) -> (u64, u64) {
    (0, 0)
}

/// `(major, minor)` for device nodes.
#[cfg(unix)]
pub fn device_numbers(metadata: &Metadata) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;
    let rdev = metadata.rdev() as libc::dev_t;
    (libc::major(rdev) as u32, libc::minor(rdev) as u32)
}

#[cfg(not(unix))]
pub fn device_numbers(_metadata: &Metadata) -> (u32, u32) {
    (0, 0)
}

/// Modification time in whole seconds; pre-epoch times clamp to 0.
pub fn modified_secs(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_destination() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("snap.tar.gz");
        let mut file = open_destination(&path)?;
        file.write_all(b"x")?;
        assert_eq!(std::fs::read(&path)?, b"x");
        Ok(())
    }

    #[test]
    fn reuses_empty_destination() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("snap.tar.gz");
        File::create(&path)?;
        let mut file = open_destination(&path)?;
        file.write_all(b"abc")?;
        assert_eq!(std::fs::read(&path)?, b"abc");
        Ok(())
    }

    #[test]
    fn refuses_non_empty_destination() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("snap.tar.gz");
        std::fs::write(&path, b"previous snapshot")?;
        match open_destination(&path) {
            Err(PackError::DestinationNotEmpty { size, .. }) => assert_eq!(size, 17),
            other => panic!("expected DestinationNotEmpty, got {:?}", other),
        }
        assert_eq!(std::fs::read(&path)?, b"previous snapshot");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn destination_is_private() -> std::result::Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir()?;
        let path = dir.path().join("snap.tar.gz");
        open_destination(&path)?;
        let mode = std::fs::metadata(&path)?.permissions().mode() & 0o777;
        assert_eq!(mode & 0o077, 0);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn classifies_kinds_without_following_links() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("f");
        std::fs::write(&file, b"data")?;
        std::os::unix::fs::symlink("f", dir.path().join("l"))?;

        assert_eq!(entry_kind(&std::fs::symlink_metadata(&file)?), EntryKind::Regular);
        assert_eq!(entry_kind(&std::fs::symlink_metadata(dir.path())?), EntryKind::Directory);
        assert_eq!(entry_kind(&std::fs::symlink_metadata(dir.path().join("l"))?), EntryKind::Symlink);
        Ok(())
    }
}
