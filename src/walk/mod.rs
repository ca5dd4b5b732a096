//! # Tree Walker
//!
//! Deterministic depth-first traversal of a source directory. Every object
//! below the root is turned into an [`Entry`] and handed to a visitor, a
//! directory always before anything inside it, siblings in file-name order.
//!
//! Regular files are opened here but never read: the open handle is moved
//! into the visitor, which streams it into the archive and drops it before
//! the walk moves on. At most one payload handle is open at any time.

use crate::common::{Entry, EntryKind};
use crate::error::{PackError, Result};
use crate::fsx;
use crate::progress::{PackEvent, ProgressTracker};
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// An entry together with the open payload handle of a regular file.
#[derive(Debug)]
pub struct WalkItem {
    pub entry: Entry,
    pub payload: Option<File>,
}

/// Check that `source_root` exists and is a directory (symlinks to a
/// directory are accepted).
pub fn check_source_root(source_root: &Path) -> Result<()> {
    let metadata = fs::metadata(source_root).map_err(|e| PackError::SourceRoot {
        source: e,
        path: source_root.to_path_buf(),
    })?;
    if !metadata.is_dir() {
        return Err(PackError::SourceRoot {
            source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
            path: source_root.to_path_buf(),
        });
    }
    Ok(())
}

/// Walk `source_root` and call `visit` once per object below it.
///
/// The root itself is never visited. The first error, whether from the
/// directory iterator, from metadata extraction or from `visit`, stops the
/// walk and is returned as is.
pub fn walk<F>(source_root: &Path, tracker: &ProgressTracker<'_>, mut visit: F) -> Result<()>
where
    F: FnMut(WalkItem) -> Result<()>,
{
    check_source_root(source_root)?;

    let walker = WalkDir::new(source_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for dir_entry in walker {
        let dir_entry = dir_entry?;
        let absolute_path = dir_entry.path();

        let metadata = dir_entry.metadata()?;
        let relative_path = relativize(source_root, absolute_path)?;
        let kind = fsx::entry_kind(&metadata);
        let (uid, gid) = fsx::ownership(&metadata);

        let mut entry = Entry {
            absolute_path: absolute_path.to_path_buf(),
            path: relative_path,
            kind,
            size: if kind.has_payload() { metadata.len() } else { 0 },
            mode: fsx::permission_bits(&metadata),
            modified_time: fsx::modified_secs(&metadata),
            uid,
            gid,
            device: None,
            link_target: None,
        };

        tracker.emit(PackEvent::EntryVisited {
            path: &entry.path,
            kind,
            size: entry.size,
        });

        let payload = match kind {
            EntryKind::Symlink => {
                let target = fs::read_link(absolute_path).map_err(|e| PackError::SymlinkRead {
                    source: e,
                    path: absolute_path.to_path_buf(),
                })?;
                tracker.emit(PackEvent::SymlinkResolved {
                    path: &entry.path,
                    target: &target,
                });
                entry.link_target = Some(target);
                None
            }
            EntryKind::Regular => {
                let file = File::open(absolute_path).map_err(|e| PackError::FileOpen {
                    source: e,
                    path: absolute_path.to_path_buf(),
                })?;
                Some(file)
            }
            EntryKind::CharDevice | EntryKind::BlockDevice => {
                entry.device = Some(fsx::device_numbers(&metadata));
                None
            }
            EntryKind::Directory | EntryKind::Fifo | EntryKind::Socket => None,
        };

        visit(WalkItem { entry, payload })?;
    }

    Ok(())
}

/// Express `path` relative to `root`, rejecting anything that is not a plain
/// downward path (empty, `..`, absolute).
pub fn relativize(root: &Path, path: &Path) -> Result<PathBuf> {
    let resolution_error = || PackError::PathResolution {
        root: root.to_path_buf(),
        path: path.to_path_buf(),
    };

    let stripped = path.strip_prefix(root).map_err(|_| resolution_error())?;
    let mut relative = PathBuf::new();
    for component in stripped.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(resolution_error()),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(resolution_error());
    }
    Ok(relative)
}
