//! Structured pack events and the optional observer that receives them.
//!
//! Observers are passed explicitly into [`crate::walk::walk`] and
//! [`crate::pack::pack_with_writer`]; nothing here is process-global. Every
//! event is also mirrored to `tracing` at debug level so a subscriber sees
//! the same stream without installing an observer.

use crate::common::EntryKind;
use serde::Serialize;
use std::cell::Cell;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One step of a pack operation.
#[derive(Debug, Clone, Copy)]
pub enum PackEvent<'a> {
    /// The walker produced an entry.
    EntryVisited {
        path: &'a Path,
        kind: EntryKind,
        size: u64,
    },
    /// A symlink's target text was read.
    SymlinkResolved { path: &'a Path, target: &'a Path },
    /// A regular file's payload was streamed into the archive.
    PayloadCopied { path: &'a Path, bytes: u64 },
    /// The container format cannot express this entry; it was left out.
    EntrySkipped {
        path: &'a Path,
        kind: EntryKind,
        reason: &'static str,
    },
    /// All layers were finalized.
    Finished(&'a PackSummary),
}

/// Receives [`PackEvent`]s. Implemented for any `Fn(&PackEvent<'_>)`.
pub trait PackObserver {
    fn on_event(&self, event: &PackEvent<'_>);
}

impl<F> PackObserver for F
where
    F: Fn(&PackEvent<'_>),
{
    fn on_event(&self, event: &PackEvent<'_>) {
        self(event)
    }
}

/// Totals reported once a snapshot has been written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackSummary {
    /// Entries written to the archive.
    pub entries: u64,
    /// Entries the container could not express.
    pub skipped: u64,
    /// Sum of regular-file payload bytes.
    pub payload_bytes: u64,
    /// Size of the tar stream before compression.
    pub archive_bytes: u64,
    /// Bytes handed to the destination sink.
    pub compressed_bytes: u64,
    pub elapsed_ms: u64,
}

/// Forwards events to the observer and keeps running totals.
///
/// Shared by reference between the walker and the encoder loop, hence the
/// `Cell` counters; a pack is single-threaded.
pub struct ProgressTracker<'o> {
    observer: Option<&'o dyn PackObserver>,
    entries: Cell<u64>,
    skipped: Cell<u64>,
    payload_bytes: Cell<u64>,
    start_time: Instant,
}

impl<'o> ProgressTracker<'o> {
    pub fn new(observer: Option<&'o dyn PackObserver>) -> Self {
        Self {
            observer,
            entries: Cell::new(0),
            skipped: Cell::new(0),
            payload_bytes: Cell::new(0),
            start_time: Instant::now(),
        }
    }

    /// Forward an event without touching the totals.
    pub fn emit(&self, event: PackEvent<'_>) {
        match &event {
            PackEvent::EntryVisited { path, kind, size } => {
                debug!(path = %path.display(), kind = %kind, size, "visited entry");
            }
            PackEvent::SymlinkResolved { path, target } => {
                debug!(path = %path.display(), target = %target.display(), "processing symlink");
            }
            PackEvent::PayloadCopied { path, bytes } => {
                debug!(path = %path.display(), bytes, "copied payload");
            }
            PackEvent::EntrySkipped { path, kind, reason } => {
                warn!(path = %path.display(), kind = %kind, reason, "skipping entry");
            }
            PackEvent::Finished(summary) => {
                debug!(entries = summary.entries, bytes = summary.compressed_bytes, "snapshot finished");
            }
        }
        if let Some(observer) = self.observer {
            observer.on_event(&event);
        }
    }

    pub fn record_written(&self, path: &Path, kind: EntryKind, payload_bytes: u64) {
        self.entries.set(self.entries.get() + 1);
        if kind.has_payload() {
            self.payload_bytes.set(self.payload_bytes.get() + payload_bytes);
            self.emit(PackEvent::PayloadCopied {
                path,
                bytes: payload_bytes,
            });
        }
    }

    pub fn record_skipped(&self, path: &Path, kind: EntryKind, reason: &'static str) {
        self.skipped.set(self.skipped.get() + 1);
        self.emit(PackEvent::EntrySkipped { path, kind, reason });
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Build the final summary; byte counts of the outer layers come from the caller.
    pub fn summary(&self, archive_bytes: u64, compressed_bytes: u64) -> PackSummary {
        PackSummary {
            entries: self.entries.get(),
            skipped: self.skipped.get(),
            payload_bytes: self.payload_bytes.get(),
            archive_bytes,
            compressed_bytes,
            elapsed_ms: self.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        copied: RefCell<Vec<(std::path::PathBuf, u64)>>,
    }

    impl PackObserver for Recorder {
        fn on_event(&self, event: &PackEvent<'_>) {
            if let PackEvent::PayloadCopied { path, bytes } = event {
                self.copied.borrow_mut().push((path.to_path_buf(), *bytes));
            }
        }
    }

    #[test]
    fn observer_receives_payload_events() {
        let recorder = Recorder::default();
        let tracker = ProgressTracker::new(Some(&recorder));
        tracker.record_written(Path::new("a.txt"), EntryKind::Regular, 5);
        tracker.record_written(Path::new("dir"), EntryKind::Directory, 0);

        assert_eq!(recorder.copied.borrow().as_slice(), &[(Path::new("a.txt").to_path_buf(), 5)]);
        let summary = tracker.summary(2048, 100);
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.payload_bytes, 5);
        assert_eq!(summary.archive_bytes, 2048);
        assert_eq!(summary.compressed_bytes, 100);
    }

    #[test]
    fn skipped_entries_are_counted_separately() {
        let tracker = ProgressTracker::new(None);
        tracker.record_skipped(Path::new("sock"), EntryKind::Socket, "sockets cannot be archived");
        let summary = tracker.summary(0, 0);
        assert_eq!(summary.entries, 0);
        assert_eq!(summary.skipped, 1);
    }
}
