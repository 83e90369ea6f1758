//! Parsers for scheme definitions and tile match evidence.
//!
//! This module provides parsers for:
//!
//! - **Scheme FASTA files**: one record per tile, with the tile's target site,
//!   polarity and subtype label encoded in the record name
//! - **Evidence tables**: tab-delimited tables of tiles found per sample, as
//!   produced by an upstream k-mer search
//!
//! Both formats may be gzip compressed (`.gz`).
//!
//! ## Tile Names
//!
//! | Record name | Target site | Polarity | Subtype |
//! |-------------|-------------|----------|---------|
//! | `308238-2.1.1.2` | 308238 | positive | 2.1.1.2 |
//! | `negative308238-2.1.1.2` | 308238 | negative | 2.1.1.2 |
//!
//! ## Example
//!
//! ```rust,no_run
//! use tile_subtyper::parsing::{evidence, fasta};
//! use std::path::Path;
//!
//! let tiles = fasta::parse_scheme_file(Path::new("heidelberg.fasta")).unwrap();
//! let samples = evidence::parse_evidence_file(Path::new("matches.tsv"), None).unwrap();
//! ```

use thiserror::Error;

pub mod evidence;
pub mod fasta;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tile name '{name}': {reason}")]
    InvalidTileName { name: String, reason: String },

    #[error("Invalid evidence table: {0}")]
    InvalidFormat(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Too many tiles: {0} exceeds maximum allowed (100000)")]
    TooManyTiles(usize),
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub(crate) fn is_gzipped(path: &std::path::Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Open a file for buffered reading, transparently decompressing gzip input
pub(crate) fn open_reader(
    path: &std::path::Path,
) -> Result<Box<dyn std::io::BufRead>, ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(std::io::BufReader::new(
            flate2::read::GzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(std::io::BufReader::new(file)))
    }
}
