//! Top-level orchestration: walker → encoder → gzip → destination.
//!
//! The layers are created outermost first and closed in reverse order on
//! every path, success or failure: tar end marker, then gzip trailer. The
//! first error wins; a cleanup failure is only reported when the walk itself
//! succeeded.

use crate::archive::{Appended, ArchiveEncoder, MetadataMode};
use crate::compress::{CompressingSink, SinkTotals, DEFAULT_LEVEL};
use crate::error::{PackError, Result};
use crate::fsx;
use crate::progress::{PackEvent, PackObserver, PackSummary, ProgressTracker};
use crate::walk::{self, WalkItem};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Holds all configuration options for a pack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// gzip level, 0 (store) to 9 (best).
    pub level: u32,
    /// Whether headers carry real mtimes and owners.
    pub metadata: MetadataMode,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            metadata: MetadataMode::Complete,
        }
    }
}

/// Create a snapshot file at `snapshot_path` from the tree under
/// `source_root`.
///
/// The destination must not exist or must be empty, see
/// [`fsx::open_destination`]. On failure the file is left behind in an
/// unusable state; callers that need atomicity should pack to a temporary
/// name and rename on success.
pub fn pack_from(
    snapshot_path: &Path,
    source_root: &Path,
    options: &PackOptions,
    observer: Option<&dyn PackObserver>,
) -> Result<PackSummary> {
    walk::check_source_root(source_root)?;
    let file = fsx::open_destination(snapshot_path)?;
    // use 1 MiB buffer to keep small gzip flushes off the syscall path
    let writer = BufWriter::with_capacity(1 << 20, file);

    let (mut writer, summary) = pack_with_writer(writer, source_root, options, observer)?;
    writer.flush().map_err(|e| PackError::Finalization {
        source: e,
        stage: "destination flush",
    })?;
    Ok(summary)
}

/// Stream a snapshot of `source_root` into `destination`.
///
/// Returns the destination (with all compressed bytes written to it) and a
/// summary of what was packed.
pub fn pack_with_writer<W: Write>(
    destination: W,
    source_root: &Path,
    options: &PackOptions,
    observer: Option<&dyn PackObserver>,
) -> Result<(W, PackSummary)> {
    let tracker = ProgressTracker::new(observer);
    info!(source = %source_root.display(), level = options.level, "packing snapshot");

    let sink = CompressingSink::new(destination, options.level);
    let mut encoder = ArchiveEncoder::new(sink, options.metadata);

    let walked = walk::walk(source_root, &tracker, |item| {
        let WalkItem { entry, payload } = item;
        match encoder.append(&entry, payload)? {
            Appended::Written { payload_bytes } => {
                tracker.record_written(&entry.path, entry.kind, payload_bytes)
            }
            Appended::Skipped { reason } => tracker.record_skipped(&entry.path, entry.kind, reason),
        }
        Ok(())
    });

    let closed = close_layers(encoder);

    match (walked, closed) {
        (Ok(()), Ok((destination, totals))) => {
            let summary = tracker.summary(totals.bytes_in, totals.bytes_out);
            tracker.emit(PackEvent::Finished(&summary));
            info!(
                entries = summary.entries,
                payload_bytes = summary.payload_bytes,
                compressed_bytes = summary.compressed_bytes,
                "snapshot written"
            );
            Ok((destination, summary))
        }
        (Ok(()), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(cleanup) = closed {
                warn!(error = %cleanup, "closing archive layers after a failed pack also failed");
            }
            Err(e)
        }
    }
}

/// Finish the tar stream, then the gzip stream.
fn close_layers<W: Write>(encoder: ArchiveEncoder<CompressingSink<W>>) -> Result<(W, SinkTotals)> {
    let sink = encoder.finish()?;
    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::{self, Read};
    use tempfile::tempdir;

    fn entry_names(snapshot: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(snapshot));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn empty_tree_gives_empty_archive() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (bytes, summary) = pack_with_writer(Vec::new(), dir.path(), &PackOptions::default(), None)?;
        assert_eq!(summary.entries, 0);
        assert_eq!(summary.archive_bytes, 1024);
        assert_eq!(summary.compressed_bytes, bytes.len() as u64);

        let mut tar_bytes = Vec::new();
        GzDecoder::new(&bytes[..]).read_to_end(&mut tar_bytes)?;
        assert_eq!(tar_bytes, vec![0u8; 1024]);
        assert!(entry_names(&bytes).is_empty());
        Ok(())
    }

    #[test]
    fn summary_counts_entries_and_bytes() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.txt"), b"hello")?;
        fs::create_dir(dir.path().join("dir"))?;
        fs::write(dir.path().join("dir").join("b.txt"), b"world!")?;

        let (bytes, summary) = pack_with_writer(Vec::new(), dir.path(), &PackOptions::default(), None)?;
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.payload_bytes, 11);
        assert_eq!(entry_names(&bytes), vec!["a.txt", "dir", "dir/b.txt"]);
        Ok(())
    }

    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "destination closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "destination closed"))
        }
    }

    #[test]
    fn closed_destination_is_reported() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.txt"), b"hello")?;

        let res = pack_with_writer(ClosedSink, dir.path(), &PackOptions::default(), None);
        assert!(matches!(res, Err(PackError::Write { .. })));
        Ok(())
    }

    #[test]
    fn closed_destination_on_empty_tree_fails_finalization() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let res = pack_with_writer(ClosedSink, dir.path(), &PackOptions::default(), None);
        assert!(matches!(res, Err(PackError::Finalization { .. })));
        Ok(())
    }

    #[test]
    fn pack_from_refuses_existing_snapshot() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let src = tempdir()?;
        fs::write(src.path().join("a.txt"), b"hello")?;
        let out = tempdir()?;
        let snapshot = out.path().join("snap.tar.gz");

        let summary = pack_from(&snapshot, src.path(), &PackOptions::default(), None)?;
        assert_eq!(summary.entries, 1);
        assert_eq!(fs::metadata(&snapshot)?.len(), summary.compressed_bytes);

        let again = pack_from(&snapshot, src.path(), &PackOptions::default(), None);
        assert!(matches!(again, Err(PackError::DestinationNotEmpty { .. })));
        Ok(())
    }
}
