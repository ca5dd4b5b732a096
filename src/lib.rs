//! # treepack
//!
//! Freezes a directory tree into one portable snapshot: a tar stream of
//! every file, directory and symlink below a root, gzip-compressed on the
//! fly and written to any `std::io::Write`. Nothing is buffered beyond the
//! entry being copied, so snapshots can be far larger than memory.
//!
//! ## Key Modules
//!
//! - [`walk`]: deterministic traversal of the source tree.
//! - [`archive`]: tar encoding with size-checked payloads.
//! - [`compress`]: the gzip sink.
//! - [`pack`]: wiring the three together with ordered cleanup.
//! - [`list`]: reading a snapshot back for inspection.
//!
//! ## Examples
//!
//! ```no_run
//! use std::path::Path;
//! use treepack::{pack_from, PackOptions};
//!
//! let summary = pack_from(
//!     Path::new("build.tar.gz"),
//!     Path::new("target/site"),
//!     &PackOptions::default(),
//!     None,
//! )?;
//! println!("packed {} entries", summary.entries);
//! # Ok::<(), treepack::PackError>(())
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod compress;
pub mod error;
pub mod list;
pub mod pack;
pub mod progress;
pub mod walk;

// Cross-platform filesystem wrapper
pub mod fsx;

pub use archive::MetadataMode;
pub use common::{Entry, EntryKind};
pub use error::{PackError, Result};
pub use pack::{pack_from, pack_with_writer, PackOptions};
pub use progress::{PackEvent, PackObserver, PackSummary};
