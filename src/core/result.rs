use serde::Serialize;

use crate::core::tile::SampleEvidence;
use crate::core::types::{InputType, QcStatus};
use crate::scheme::store::Scheme;

/// Subtyping result for one (sample, scheme) pair.
///
/// Built once by the engine and never mutated afterwards; serialization is left
/// to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtypeResult {
    pub sample: String,
    pub scheme: String,
    pub scheme_version: Option<String>,
    pub source_file: Option<String>,
    pub input_type: InputType,

    /// Deepest consistent label, the common ancestor of tied labels, or none
    pub subtype: Option<String>,
    pub are_subtypes_consistent: bool,
    pub inconsistent_subtypes: Vec<String>,
    /// Labels on the called path, root first
    pub all_subtypes_matched: Vec<String>,
    /// Ids of the matched positive tiles specific to `subtype`
    pub tiles_matching_subtype: Vec<String>,

    pub n_tiles_matching_all: usize,
    pub n_tiles_matching_all_expected: usize,
    pub n_tiles_matching_positive: usize,
    pub n_tiles_matching_positive_expected: usize,
    pub n_tiles_matching_negative: usize,
    pub n_tiles_matching_negative_expected: usize,
    pub n_tiles_matching_subtype: usize,
    pub n_tiles_matching_subtype_expected: usize,

    /// Read input only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_tile_coverage: Option<f64>,
    pub is_intermediate_subtype: bool,

    pub qc_status: QcStatus,
    /// Empty on PASS
    pub qc_message: String,
}

impl SubtypeResult {
    /// A FAIL result for a sample whose evidence could not be resolved
    pub fn failed(evidence: &SampleEvidence, scheme: &Scheme, message: impl AsRef<str>) -> Self {
        Self {
            sample: evidence.sample.clone(),
            scheme: scheme.name.clone(),
            scheme_version: scheme.version.clone(),
            source_file: evidence.source_file.clone(),
            input_type: evidence.input_type,
            subtype: None,
            are_subtypes_consistent: false,
            inconsistent_subtypes: Vec::new(),
            all_subtypes_matched: Vec::new(),
            tiles_matching_subtype: Vec::new(),
            n_tiles_matching_all: 0,
            n_tiles_matching_all_expected: scheme.n_target_sites(),
            n_tiles_matching_positive: 0,
            n_tiles_matching_positive_expected: 0,
            n_tiles_matching_negative: 0,
            n_tiles_matching_negative_expected: scheme.n_target_sites(),
            n_tiles_matching_subtype: 0,
            n_tiles_matching_subtype_expected: 0,
            avg_tile_coverage: None,
            is_intermediate_subtype: false,
            qc_status: QcStatus::Fail,
            qc_message: format!("{}: Error: {}", QcStatus::Fail, message.as_ref()),
        }
    }

    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.qc_status == QcStatus::Pass
    }
}

/// Column names of the tab-separated report
#[must_use]
pub fn tsv_header(include_coverage: bool) -> Vec<&'static str> {
    let mut header = vec![
        "sample",
        "scheme",
        "scheme_version",
        "subtype",
        "all_subtypes",
        "tiles_matching_subtype",
        "are_subtypes_consistent",
        "inconsistent_subtypes",
        "n_tiles_matching_all",
        "n_tiles_matching_all_expected",
        "n_tiles_matching_positive",
        "n_tiles_matching_positive_expected",
        "n_tiles_matching_negative",
        "n_tiles_matching_negative_expected",
        "n_tiles_matching_subtype",
        "n_tiles_matching_subtype_expected",
        "file_path",
        "input_type",
    ];
    if include_coverage {
        header.push("avg_tile_coverage");
    }
    header.extend(["is_intermediate_subtype", "qc_status", "qc_message"]);
    header
}

/// One report row, aligned with [`tsv_header`]
#[must_use]
pub fn tsv_record(result: &SubtypeResult, include_coverage: bool) -> Vec<String> {
    let mut record = vec![
        result.sample.clone(),
        result.scheme.clone(),
        result.scheme_version.clone().unwrap_or_default(),
        result.subtype.clone().unwrap_or_default(),
        result.all_subtypes_matched.join("; "),
        result.tiles_matching_subtype.join("; "),
        result.are_subtypes_consistent.to_string(),
        result.inconsistent_subtypes.join("; "),
        result.n_tiles_matching_all.to_string(),
        result.n_tiles_matching_all_expected.to_string(),
        result.n_tiles_matching_positive.to_string(),
        result.n_tiles_matching_positive_expected.to_string(),
        result.n_tiles_matching_negative.to_string(),
        result.n_tiles_matching_negative_expected.to_string(),
        result.n_tiles_matching_subtype.to_string(),
        result.n_tiles_matching_subtype_expected.to_string(),
        result.source_file.clone().unwrap_or_default(),
        result.input_type.to_string(),
    ];
    if include_coverage {
        record.push(
            result
                .avg_tile_coverage
                .map(|c| format!("{c:.3}"))
                .unwrap_or_default(),
        );
    }
    record.extend([
        result.is_intermediate_subtype.to_string(),
        result.qc_status.to_string(),
        result.qc_message.clone(),
    ]);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tile::{Tile, TileHit};

    fn make_scheme() -> Scheme {
        Scheme::new(
            "test",
            vec![Tile::positive(1, "1"), Tile::negative(1, "1")],
        )
        .unwrap()
        .with_version("0.1.0")
    }

    #[test]
    fn test_failed_result() {
        let evidence = SampleEvidence::new("s1", InputType::Reads, vec![TileHit::new("bogus")])
            .with_source_file("s1.fastq");
        let result = SubtypeResult::failed(&evidence, &make_scheme(), "unknown tile 'bogus'");

        assert_eq!(result.qc_status, QcStatus::Fail);
        assert_eq!(result.qc_message, "FAIL: Error: unknown tile 'bogus'");
        assert_eq!(result.scheme_version.as_deref(), Some("0.1.0"));
        assert_eq!(result.source_file.as_deref(), Some("s1.fastq"));
        assert!(result.subtype.is_none());
        assert!(!result.is_pass());
    }

    #[test]
    fn test_tsv_record_matches_header() {
        let evidence = SampleEvidence::new("s1", InputType::Contigs, Vec::new());
        let result = SubtypeResult::failed(&evidence, &make_scheme(), "oops");

        for include_coverage in [false, true] {
            let header = tsv_header(include_coverage);
            let record = tsv_record(&result, include_coverage);
            assert_eq!(header.len(), record.len());
        }
        assert!(!tsv_header(false).contains(&"avg_tile_coverage"));
    }

    #[test]
    fn test_json_omits_missing_coverage() {
        let evidence = SampleEvidence::new("s1", InputType::Contigs, Vec::new());
        let result = SubtypeResult::failed(&evidence, &make_scheme(), "oops");
        let json = serde_json::to_value(&result).unwrap();

        assert!(json.get("avg_tile_coverage").is_none());
        assert_eq!(json["qc_status"], "FAIL");
        assert_eq!(json["input_type"], "contigs");
    }
}
