//! # Compressing Sink
//!
//! Wraps the destination in a streaming gzip encoder. The gzip header is
//! fixed (mtime 0, OS "unknown"), so the same tar stream always compresses
//! to the same bytes.
//!
//! [`CompressingSink::finish`] writes the gzip trailer and must run after the
//! archive encoder has written its end marker. If the sink is dropped without
//! `finish`, `flate2` still attempts to write the trailer, but any error is
//! lost.

use crate::error::{PackError, Result};
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use std::io::{self, Write};

/// gzip level used when none is configured.
pub const DEFAULT_LEVEL: u32 = 6;

/// Byte counts of a finished sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkTotals {
    /// Uncompressed bytes written into the sink.
    pub bytes_in: u64,
    /// Compressed bytes forwarded to the destination.
    pub bytes_out: u64,
}

/// Counts the bytes that reach the destination.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A write sink that gzip-compresses everything and forwards it to `W`.
pub struct CompressingSink<W: Write> {
    encoder: GzEncoder<CountingWriter<W>>,
    bytes_in: u64,
}

impl<W: Write> CompressingSink<W> {
    /// Wrap `destination`. Levels above 9 are clamped to 9.
    pub fn new(destination: W, level: u32) -> Self {
        let encoder = GzBuilder::new()
            .mtime(0)
            .operating_system(255)
            .write(
                CountingWriter {
                    inner: destination,
                    written: 0,
                },
                Compression::new(level.min(9)),
            );
        Self {
            encoder,
            bytes_in: 0,
        }
    }

    /// Write the gzip trailer and hand back the destination.
    pub fn finish(self) -> Result<(W, SinkTotals)> {
        let bytes_in = self.bytes_in;
        let counting = self.encoder.finish().map_err(|e| PackError::Finalization {
            source: e,
            stage: "gzip trailer",
        })?;
        let totals = SinkTotals {
            bytes_in,
            bytes_out: counting.written,
        };
        Ok((counting.inner, totals))
    }
}

impl<W: Write> Write for CompressingSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.encoder.write(buf)?;
        self.bytes_in += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}
