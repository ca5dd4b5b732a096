//! Reading a snapshot back for inspection.

use crate::common::EntryKind;
use crate::error::{PackError, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tar::{Archive, EntryType};

/// One record of a snapshot as seen by a reader.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    /// `None` for tar types this crate never writes (hard links, PAX records…).
    pub kind: Option<EntryKind>,
    pub size: u64,
    pub mode: u32,
    pub modified_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<PathBuf>,
}

impl ListedEntry {
    /// `ls -l`-style line used by the CLI.
    pub fn display_line(&self) -> String {
        let kind = self.kind.map(|k| k.as_str()).unwrap_or("other");
        let modified = chrono::DateTime::from_timestamp(self.modified_time as i64, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut line = format!(
            "{:<7} {:04o} {:>12} {} {}",
            kind,
            self.mode,
            self.size,
            modified,
            self.path.display()
        );
        if let Some(target) = &self.link_target {
            line.push_str(" -> ");
            line.push_str(&target.display().to_string());
        }
        line
    }
}

fn kind_of(entry_type: EntryType) -> Option<EntryKind> {
    match entry_type {
        EntryType::Regular | EntryType::Continuous => Some(EntryKind::Regular),
        EntryType::Directory => Some(EntryKind::Directory),
        EntryType::Symlink => Some(EntryKind::Symlink),
        EntryType::Char => Some(EntryKind::CharDevice),
        EntryType::Block => Some(EntryKind::BlockDevice),
        EntryType::Fifo => Some(EntryKind::Fifo),
        _ => None,
    }
}

/// Decode a gzip-compressed tar stream and return its entries in order.
pub fn list_entries<R: Read>(reader: R) -> Result<Vec<ListedEntry>> {
    let read_error = |source| PackError::ArchiveRead { source };
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut listed = Vec::new();

    for entry in archive.entries().map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let header = entry.header();
        listed.push(ListedEntry {
            path: entry.path().map_err(read_error)?.into_owned(),
            kind: kind_of(header.entry_type()),
            size: header.size().map_err(read_error)?,
            mode: header.mode().map_err(read_error)?,
            modified_time: header.mtime().map_err(read_error)?,
            link_target: entry.link_name().map_err(read_error)?.map(|p| p.into_owned()),
        });
    }
    Ok(listed)
}
