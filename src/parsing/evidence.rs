//! Parser for tile match evidence tables.
//!
//! The table is tab-delimited with a header row. Required columns are
//! `sample` and `tile_id`; `freq` (k-mer frequency, read input only) and
//! `source_file` are optional. Each row means the tile was found in the
//! sample; tiles without a row were not found.
//!
//! ```text
//! sample	tile_id	freq
//! SRR1002850	308238-2.1.1.2	31
//! SRR1002850	negative3872935-2.1.1.2	27
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::core::tile::{SampleEvidence, TileHit};
use crate::core::types::InputType;
use crate::parsing::{open_reader, ParseError};
use crate::utils::validation::check_evidence_limit;

#[derive(Debug, Deserialize)]
struct EvidenceRow {
    sample: String,
    tile_id: String,
    #[serde(default)]
    freq: Option<u64>,
    #[serde(default)]
    source_file: Option<String>,
}

/// Parse an evidence table file (optionally gzipped)
///
/// When `input_type` is `None` it is inferred per sample: a sample whose rows
/// carry frequencies is read input, otherwise contig input.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Csv` for
/// malformed rows, or `ParseError::InvalidFormat` if the table is too large.
pub fn parse_evidence_file(
    path: &Path,
    input_type: Option<InputType>,
) -> Result<Vec<SampleEvidence>, ParseError> {
    let reader = open_reader(path)?;
    let mut samples = parse_evidence_reader(reader, input_type)?;

    let path_str = path.display().to_string();
    for sample in &mut samples {
        if sample.source_file.is_none() {
            sample.source_file = Some(path_str.clone());
        }
    }
    Ok(samples)
}

/// Parse evidence rows from any reader, grouping rows by sample in
/// first-appearance order
///
/// # Errors
///
/// See [`parse_evidence_file`].
pub fn parse_evidence_reader<R: Read>(
    reader: R,
    input_type: Option<InputType>,
) -> Result<Vec<SampleEvidence>, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut samples: Vec<SampleEvidence> = Vec::new();
    let mut index_by_sample: HashMap<String, usize> = HashMap::new();
    let mut n_rows = 0usize;

    for result in csv_reader.deserialize::<EvidenceRow>() {
        let row = result?;

        if let Some(msg) = check_evidence_limit(n_rows) {
            return Err(ParseError::InvalidFormat(msg));
        }
        n_rows += 1;

        if row.sample.is_empty() || row.tile_id.is_empty() {
            return Err(ParseError::InvalidFormat(format!(
                "Row {n_rows} has an empty sample or tile_id"
            )));
        }

        let idx = *index_by_sample
            .entry(row.sample.clone())
            .or_insert_with(|| {
                samples.push(SampleEvidence::new(
                    row.sample.clone(),
                    InputType::Contigs,
                    Vec::new(),
                ));
                samples.len() - 1
            });

        let sample = &mut samples[idx];
        if sample.source_file.is_none() {
            sample.source_file = row.source_file;
        }
        sample.hits.push(TileHit {
            tile_id: row.tile_id,
            frequency: row.freq,
        });
    }

    for sample in &mut samples {
        sample.input_type = input_type.unwrap_or_else(|| infer_input_type(&sample.hits));
    }

    Ok(samples)
}

/// Read input reports a frequency for found tiles; contig input does not
fn infer_input_type(hits: &[TileHit]) -> InputType {
    if hits.iter().any(|h| h.frequency.is_some()) {
        InputType::Reads
    } else {
        InputType::Contigs
    }
}
