//! CLI dispatch shared by the `treepack` binary and the integration tests.

use crate::archive::MetadataMode;
use crate::cli::{self, Args, Commands};
use crate::list;
use crate::pack::{pack_from, PackOptions};
use crate::progress::{PackEvent, PackObserver};
use std::fs::File;
use std::io::{self, BufReader, Write};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "TREEPACK_LOG";

/// Parse the command line and run the selected command.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run()?;
    init_logging(args.verbose);
    execute(args)
}

/// Run an already parsed command.
pub fn execute(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Commands::Pack { source, output, level, deterministic, progress, json } => {
            let options = PackOptions {
                level,
                metadata: if deterministic {
                    MetadataMode::Deterministic
                } else {
                    MetadataMode::Complete
                },
            };
            let printer = StderrProgress;
            let observer: Option<&dyn PackObserver> = if progress { Some(&printer) } else { None };

            let summary = pack_from(&output, &source, &options, observer)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Packed {} entries ({} payload bytes) into {} ({} bytes)",
                    summary.entries,
                    summary.payload_bytes,
                    output.display(),
                    summary.compressed_bytes
                );
                if summary.skipped > 0 {
                    println!("Skipped {} entries the tar format cannot represent", summary.skipped);
                }
            }
        }
        Commands::List { snapshot, json } => {
            let file = File::open(&snapshot)?;
            let entries = list::list_entries(BufReader::new(file))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if json {
                serde_json::to_writer_pretty(&mut out, &entries)?;
                writeln!(out)?;
            } else {
                writeln!(out, "Snapshot {} ({} entries):", snapshot.display(), entries.len())?;
                for entry in &entries {
                    writeln!(out, "{}", entry.display_line())?;
                }
            }
        }
    }

    Ok(())
}

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `TREEPACK_LOG` wins when set; otherwise `--verbose` selects debug level.
fn init_logging(verbose: bool) {
    let default = if verbose { "treepack=debug" } else { "treepack=info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    // A second initialisation (tests calling run twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Prints one line per packed entry to stderr.
struct StderrProgress;

impl PackObserver for StderrProgress {
    fn on_event(&self, event: &PackEvent<'_>) {
        let mut err = io::stderr().lock();
        // Progress output is best effort; a closed stderr must not fail the pack.
        let _ = match event {
            PackEvent::EntryVisited { path, kind, size } => {
                writeln!(err, "[pack] {:<7} {:>12} {}", kind, size, path.display())
            }
            PackEvent::EntrySkipped { path, reason, .. } => {
                writeln!(err, "[pack] skipped {} ({})", path.display(), reason)
            }
            PackEvent::Finished(summary) => writeln!(
                err,
                "[pack] done: {} entries, {} bytes in {} ms",
                summary.entries, summary.compressed_bytes, summary.elapsed_ms
            ),
            PackEvent::SymlinkResolved { .. } | PackEvent::PayloadCopied { .. } => Ok(()),
        };
    }
}
