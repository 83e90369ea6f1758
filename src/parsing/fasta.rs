//! Parser for scheme FASTA files using noodles.
//!
//! Each record is one tile. The record name encodes the tile:
//! `{target_site}-{subtype}` for positive tiles and
//! `negative{target_site}-{subtype}` for negative tiles.
//!
//! Supports both uncompressed and gzip compressed files.

use std::io::BufRead;
use std::path::Path;

use noodles::fasta;

use crate::core::tile::Tile;
use crate::core::types::Polarity;
use crate::parsing::{open_reader, ParseError};
use crate::utils::validation::{check_tile_limit, is_valid_subtype_label};

const NEGATIVE_PREFIX: &str = "negative";

/// Parse a tile name such as `negative3872935-2.1.1.2` into a [`Tile`]
///
/// # Errors
///
/// Returns `ParseError::InvalidTileName` if the name does not follow the
/// `[negative]{site}-{subtype}` convention.
pub fn parse_tile_name(name: &str) -> Result<Tile, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidTileName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let (polarity, rest) = match name.strip_prefix(NEGATIVE_PREFIX) {
        Some(rest) => (Polarity::Negative, rest),
        None => (Polarity::Positive, name),
    };

    let (site, subtype) = rest
        .split_once('-')
        .ok_or_else(|| invalid("expected '<target site>-<subtype>'"))?;

    let target_site: u64 = site
        .trim()
        .parse()
        .map_err(|_| invalid("target site is not a non-negative integer"))?;

    let subtype = subtype.trim();
    if !is_valid_subtype_label(subtype) {
        return Err(invalid("subtype is not a dot-delimited label"));
    }

    Ok(Tile::new(name, target_site, subtype, polarity))
}

/// Parse a scheme FASTA file (optionally gzipped) into its tiles, in file order
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// FASTA parsing fails, `ParseError::InvalidTileName` for malformed record
/// names, or `ParseError::TooManyTiles` if the limit is exceeded.
pub fn parse_scheme_file(path: &Path) -> Result<Vec<Tile>, ParseError> {
    let reader = open_reader(path)?;
    let mut fasta_reader = fasta::io::Reader::new(reader);
    parse_scheme_reader(&mut fasta_reader)
}

/// Parse scheme tiles from a noodles FASTA reader
///
/// # Errors
///
/// See [`parse_scheme_file`].
pub fn parse_scheme_reader<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
) -> Result<Vec<Tile>, ParseError> {
    let mut tiles = Vec::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        // Check tile limit for DOS protection
        if check_tile_limit(tiles.len()).is_some() {
            return Err(ParseError::TooManyTiles(tiles.len()));
        }

        let name = String::from_utf8_lossy(record.name()).to_string();
        if record.sequence().is_empty() {
            return Err(ParseError::InvalidTileName {
                name,
                reason: "tile has an empty sequence".to_string(),
            });
        }

        tiles.push(parse_tile_name(&name)?);
    }

    Ok(tiles)
}

/// Parse scheme tiles from FASTA text
///
/// # Errors
///
/// See [`parse_scheme_file`].
pub fn parse_scheme_text(text: &str) -> Result<Vec<Tile>, ParseError> {
    let mut reader = fasta::io::Reader::new(text.as_bytes());
    parse_scheme_reader(&mut reader)
}
