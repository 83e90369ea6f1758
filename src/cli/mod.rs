//! Command-line interface for tile-subtyper.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **subtype**: Subtype samples from a tile evidence table against a scheme
//! - **scheme**: Summarise a scheme's subtypes and target sites
//!
//! ## Usage
//!
//! ```text
//! # Subtype every sample in an evidence table
//! tile-subtyper subtype --scheme heidelberg.fasta matches.tsv
//!
//! # Reads evidence, 8 worker threads, TSV report written to a file
//! tile-subtyper --format tsv subtype -s heidelberg.fasta -t 8 -o report.tsv reads.tsv
//!
//! # Relax the missing tiles threshold
//! tile-subtyper subtype -s heidelberg.fasta --max-missing-tiles 0.1 matches.tsv
//!
//! # Show the scheme hierarchy
//! tile-subtyper scheme heidelberg.fasta
//! ```

use clap::{Parser, Subcommand};

pub mod scheme;
pub mod subtype;

#[derive(Parser)]
#[command(name = "tile-subtyper")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Hierarchical genomic subtyping from tile match evidence")]
#[command(
    long_about = "tile-subtyper calls the most specific hierarchical subtype supported by the tiles found in a genome.\n\nFor each sample it reports:\n- The deepest consistent subtype and every level above it\n- Observed vs expected tile counts\n- A QC verdict (PASS, WARNING or FAIL) explaining how far the call can be trusted"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subtype samples from a tile evidence table
    Subtype(subtype::SubtypeArgs),

    /// Summarise a subtyping scheme
    Scheme(scheme::SchemeArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Open the output destination: a file when given, stdout otherwise
pub(crate) fn open_output(
    path: Option<&std::path::Path>,
) -> anyhow::Result<Box<dyn std::io::Write>> {
    match path {
        Some(p) => {
            let file = std::fs::File::create(p)
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", p.display()))?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}
