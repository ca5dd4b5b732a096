use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log every visited entry (overridden by TREEPACK_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Pack a directory tree into a new tar.gz snapshot.
    #[command(alias = "p")]
    Pack {
        /// Directory whose contents are captured. The directory itself is not an entry.
        #[arg(required = true)]
        source: PathBuf,

        /// The path for the snapshot file. Must not exist or must be empty.
        #[arg(short, long)]
        output: PathBuf,

        /// gzip compression level (0-9). Higher levels compress better at the cost of speed.
        #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
        level: u32,

        /// Zero mtimes and owners so identical trees produce identical snapshots.
        #[arg(long)]
        deterministic: bool,

        /// Print each entry to stderr as it is packed.
        #[arg(long)]
        progress: bool,

        /// Print the summary as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// List the entries of a snapshot without extracting it.
    #[command(alias = "l")]
    List {
        /// The snapshot file to list.
        #[arg(required = true)]
        snapshot: PathBuf,

        /// Print entries as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Result<Args, Box<dyn std::error::Error>> {
    Ok(Args::parse())
}
