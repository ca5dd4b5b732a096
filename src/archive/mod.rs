//! # Archive Encoder
//!
//! Serializes [`Entry`] records and their payloads into a tar stream: one
//! 512-byte header per entry (plus GNU long-name records when a path or link
//! target does not fit), the payload padded to the block size, and two zero
//! blocks as end-of-archive marker.
//!
//! Payloads pass through a [`BoundedReader`] that yields exactly the size
//! written in the header. A source that is shorter or longer than that is
//! reported as [`PackError::SizeMismatch`] instead of producing a stream
//! whose headers lie about their records.

use crate::common::{Entry, EntryKind};
use crate::error::{PackError, Result};
use std::io::{self, Read, Write};
use tar::{Builder, EntryType, Header};

/// How much host-specific metadata ends up in each header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataMode {
    /// Real modification times and numeric owner ids.
    #[default]
    Complete,
    /// mtime, uid and gid are zeroed so identical trees give identical bytes.
    Deterministic,
}

/// What [`ArchiveEncoder::append`] did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// Header (and payload, for regular files) written.
    Written { payload_bytes: u64 },
    /// The container cannot express this kind of entry.
    Skipped { reason: &'static str },
}

/// Why a bounded payload copy stopped early.
#[derive(Debug)]
enum PayloadFault {
    Read(io::Error),
    Short,
}

/// Reader over a payload source that hands out at most `expected` bytes and
/// remembers whether the source misbehaved.
pub struct BoundedReader<R> {
    inner: R,
    expected: u64,
    copied: u64,
    fault: Option<PayloadFault>,
}

impl<R: Read> BoundedReader<R> {
    pub fn new(inner: R, expected: u64) -> Self {
        Self {
            inner,
            expected,
            copied: 0,
            fault: None,
        }
    }

    /// Bytes handed out so far.
    pub fn copied(&self) -> u64 {
        self.copied
    }

    /// True if the source still has data after `expected` bytes.
    fn has_trailing_data(&mut self) -> io::Result<bool> {
        let mut probe = [0u8; 1];
        loop {
            match self.inner.read(&mut probe) {
                Ok(n) => return Ok(n > 0),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.expected - self.copied;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        match self.inner.read(&mut buf[..max]) {
            Ok(0) => {
                self.fault = Some(PayloadFault::Short);
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "payload ended before the declared size",
                ))
            }
            Ok(n) => {
                self.copied += n as u64;
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                let kind = e.kind();
                self.fault = Some(PayloadFault::Read(e));
                Err(io::Error::new(kind, "payload read failed"))
            }
        }
    }
}

/// Streams entries into a tar archive written to `W`.
pub struct ArchiveEncoder<W: Write> {
    builder: Builder<W>,
    metadata: MetadataMode,
}

impl<W: Write> ArchiveEncoder<W> {
    pub fn new(sink: W, metadata: MetadataMode) -> Self {
        Self {
            builder: Builder::new(sink),
            metadata,
        }
    }

    /// Build the tar header for `entry`. Path and checksum are filled in by
    /// the builder when the record is appended.
    pub fn header_for(&self, entry: &Entry) -> Result<Header> {
        let mut header = Header::new_gnu();
        let entry_type = match entry.kind {
            EntryKind::Regular => EntryType::Regular,
            EntryKind::Directory => EntryType::Directory,
            EntryKind::Symlink => EntryType::Symlink,
            EntryKind::CharDevice => EntryType::Char,
            EntryKind::BlockDevice => EntryType::Block,
            EntryKind::Fifo => EntryType::Fifo,
            EntryKind::Socket => {
                return Err(PackError::Write {
                    source: io::Error::new(io::ErrorKind::InvalidInput, "sockets have no tar type"),
                    path: entry.path.clone(),
                })
            }
        };
        header.set_entry_type(entry_type);
        header.set_size(if entry.kind.has_payload() { entry.size } else { 0 });
        header.set_mode(entry.mode & 0o7777);

        match self.metadata {
            MetadataMode::Complete => {
                header.set_mtime(entry.modified_time);
                header.set_uid(entry.uid);
                header.set_gid(entry.gid);
            }
            MetadataMode::Deterministic => {
                header.set_mtime(0);
                header.set_uid(0);
                header.set_gid(0);
            }
        }

        if let Some((major, minor)) = entry.device {
            let write_error = |e: io::Error| PackError::Write {
                source: e,
                path: entry.path.clone(),
            };
            header.set_device_major(major).map_err(write_error)?;
            header.set_device_minor(minor).map_err(write_error)?;
        }
        Ok(header)
    }

    /// Write one entry. `payload` must be `Some` for regular files and is
    /// ignored for every other kind.
    pub fn append<R: Read>(&mut self, entry: &Entry, payload: Option<R>) -> Result<Appended> {
        if entry.kind == EntryKind::Socket {
            return Ok(Appended::Skipped {
                reason: "sockets cannot be stored in a tar archive",
            });
        }

        let mut header = self.header_for(entry)?;
        let write_error = |e: io::Error| PackError::Write {
            source: e,
            path: entry.path.clone(),
        };

        match (entry.kind, payload) {
            (EntryKind::Symlink, _) => {
                let target = entry.link_target.as_deref().ok_or_else(|| PackError::SymlinkRead {
                    source: io::Error::new(io::ErrorKind::InvalidInput, "symlink entry without target"),
                    path: entry.absolute_path.clone(),
                })?;
                self.builder
                    .append_link(&mut header, &entry.path, target)
                    .map_err(write_error)?;
                Ok(Appended::Written { payload_bytes: 0 })
            }
            (EntryKind::Regular, Some(source)) => self.append_payload(entry, &mut header, source),
            (EntryKind::Regular, None) => Err(PackError::FileOpen {
                source: io::Error::new(io::ErrorKind::InvalidInput, "regular file entry without payload"),
                path: entry.absolute_path.clone(),
            }),
            _ => {
                self.builder
                    .append_data(&mut header, &entry.path, io::empty())
                    .map_err(write_error)?;
                Ok(Appended::Written { payload_bytes: 0 })
            }
        }
    }

    fn append_payload<R: Read>(&mut self, entry: &Entry, header: &mut Header, source: R) -> Result<Appended> {
        let mut bounded = BoundedReader::new(source, entry.size);
        let appended = self.builder.append_data(header, &entry.path, &mut bounded);

        if let Err(e) = appended {
            return Err(match bounded.fault.take() {
                Some(PayloadFault::Read(source)) => PackError::FileRead {
                    source,
                    path: entry.absolute_path.clone(),
                },
                Some(PayloadFault::Short) => PackError::SizeMismatch {
                    path: entry.absolute_path.clone(),
                    expected: entry.size,
                    actual: bounded.copied(),
                },
                None => PackError::Write {
                    source: e,
                    path: entry.path.clone(),
                },
            });
        }

        match bounded.has_trailing_data() {
            Ok(false) => Ok(Appended::Written {
                payload_bytes: bounded.copied(),
            }),
            Ok(true) => Err(PackError::SizeMismatch {
                path: entry.absolute_path.clone(),
                expected: entry.size,
                actual: entry.size + 1,
            }),
            Err(source) => Err(PackError::FileRead {
                source,
                path: entry.absolute_path.clone(),
            }),
        }
    }

    /// Write the end-of-archive marker and return the sink.
    ///
    /// If this is never called the builder's destructor writes the marker on
    /// a best-effort basis.
    pub fn finish(self) -> Result<W> {
        self.builder.into_inner().map_err(|e| PackError::Finalization {
            source: e,
            stage: "end-of-archive marker",
        })
    }
}
