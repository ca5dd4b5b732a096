//! Shared entry types passed from the walker to the encoder.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Kind of filesystem object, taken from the `lstat` file type.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
}

impl EntryKind {
    /// Only regular files carry payload bytes.
    pub fn has_payload(self) -> bool {
        matches!(self, EntryKind::Regular)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Regular => "file",
            EntryKind::Directory => "dir",
            EntryKind::Symlink => "symlink",
            EntryKind::CharDevice => "char",
            EntryKind::BlockDevice => "block",
            EntryKind::Fifo => "fifo",
            EntryKind::Socket => "socket",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for a single filesystem object discovered under the source root.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Location on disk, used to open payloads and in error messages.
    pub absolute_path: PathBuf,
    /// Path relative to the source root. Only normal components.
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Byte length for regular files, 0 for every other kind.
    pub size: u64,
    /// Permission bits including setuid/setgid/sticky (`mode & 0o7777`).
    pub mode: u32,
    pub modified_time: u64, // Unix timestamp
    pub uid: u64,
    pub gid: u64,
    /// `(major, minor)` for character and block devices.
    pub device: Option<(u32, u32)>,
    /// Raw link text, never resolved.
    pub link_target: Option<PathBuf>,
}
