//! End-to-end subtyping scenarios.
//!
//! Each scenario builds a scheme from per-label site counts, fabricates the
//! tiles an upstream search would have found, and checks the call and QC
//! verdict produced by the engine.

use tile_subtyper::core::tile::{Tile, TileHit};
use tile_subtyper::subtyping::qc::{
    AMBIGUOUS_RESULTS_ERROR, INTERMEDIATE_SUBTYPE_WARNING, MISSING_TILES_ERROR, NO_SUBTYPE_RESULT,
    UNCONFIDENT_RESULTS_ERROR,
};
use tile_subtyper::{
    InputType, ParamOverrides, QcStatus, SampleEvidence, Scheme, SubtypeResult, SubtypingConfig,
    SubtypingEngine,
};

/// Which allele (if any) the sample carries at a target site
#[derive(Clone, Copy)]
enum Allele {
    Positive,
    Negative,
    Both,
    Missing,
}

/// Build a scheme with `n` target sites per label; sites are numbered
/// 1000, 2000, ... in label order.
fn build_scheme(levels: &[(&str, usize)]) -> Scheme {
    let mut tiles = Vec::new();
    let mut position = 0u64;
    for &(label, n_sites) in levels {
        for _ in 0..n_sites {
            position += 1000;
            tiles.push(Tile::positive(position, label));
            tiles.push(Tile::negative(position, label));
        }
    }
    Scheme::new("scenario", tiles).unwrap().with_version("1.0.0")
}

/// Tiles found for each site, chosen by `allele(label, site_index_within_label)`
fn make_hits(scheme: &Scheme, allele: impl Fn(&str, usize) -> Allele) -> Vec<TileHit> {
    let hierarchy = scheme.hierarchy();
    let mut seen_per_label = std::collections::HashMap::new();
    let mut hits = Vec::new();

    for site in scheme.sites() {
        let label = hierarchy.label(site.node);
        let index = seen_per_label.entry(label.to_string()).or_insert(0usize);
        let positive = || TileHit::new(format!("{}-{label}", site.position));
        let negative = || TileHit::new(format!("negative{}-{label}", site.position));

        match allele(label, *index) {
            Allele::Positive => hits.push(positive()),
            Allele::Negative => hits.push(negative()),
            Allele::Both => {
                hits.push(positive());
                hits.push(negative());
            }
            Allele::Missing => {}
        }
        *index += 1;
    }
    hits
}

/// Positive allele on the listed labels, negative everywhere else
fn on_path(labels: &'static [&'static str]) -> impl Fn(&str, usize) -> Allele {
    move |label: &str, _: usize| {
        if labels.iter().any(|l| *l == label) {
            Allele::Positive
        } else {
            Allele::Negative
        }
    }
}

fn with_frequencies(hits: Vec<TileHit>, freq: impl Fn(usize) -> u64) -> Vec<TileHit> {
    hits.into_iter()
        .enumerate()
        .map(|(i, hit)| hit.with_frequency(freq(i)))
        .collect()
}

fn run(scheme: &Scheme, sample: &SampleEvidence, config: SubtypingConfig) -> SubtypeResult {
    let engine = SubtypingEngine::new(scheme, config).unwrap();
    engine.subtype_sample(sample)
}

fn assert_count_invariants(result: &SubtypeResult) {
    assert!(result.n_tiles_matching_subtype <= result.n_tiles_matching_positive);
    assert!(result.n_tiles_matching_positive <= result.n_tiles_matching_all);
}

fn heidelberg_like_scheme() -> Scheme {
    build_scheme(&[
        ("1", 60),
        ("2", 3),
        ("2.1", 50),
        ("2.2", 3),
        ("2.2.1", 40),
        ("2.2.2", 3),
        ("2.2.2.2", 3),
        ("2.2.2.2.1", 2),
        ("2.2.2.2.1.1", 35),
        ("2.2.2.2.1.4", 3),
    ])
}

const HEIDELBERG_PATH: &[&str] = &["2", "2.2", "2.2.2", "2.2.2.2", "2.2.2.2.1", "2.2.2.2.1.4"];

#[test]
fn test_complete_contig_evidence_passes() {
    let scheme = heidelberg_like_scheme();
    let hits = make_hits(&scheme, on_path(HEIDELBERG_PATH));
    let sample = SampleEvidence::new("SRR1002850", InputType::Contigs, hits)
        .with_source_file("SRR1002850.fasta");

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert_eq!(result.subtype.as_deref(), Some("2.2.2.2.1.4"));
    assert_eq!(result.all_subtypes_matched, HEIDELBERG_PATH);
    assert!(result.are_subtypes_consistent);
    assert!(result.inconsistent_subtypes.is_empty());
    assert_eq!(result.n_tiles_matching_all, 202);
    assert_eq!(result.n_tiles_matching_all_expected, 202);
    assert_eq!(result.n_tiles_matching_positive, 17);
    assert_eq!(result.n_tiles_matching_positive_expected, 17);
    assert_eq!(result.n_tiles_matching_negative, 185);
    assert_eq!(result.n_tiles_matching_subtype, 3);
    assert_eq!(result.n_tiles_matching_subtype_expected, 3);
    assert_eq!(result.tiles_matching_subtype.len(), 3);
    assert_eq!(result.qc_status, QcStatus::Pass);
    assert!(result.qc_message.is_empty());
    assert!(result.avg_tile_coverage.is_none());
    assert_eq!(result.scheme_version.as_deref(), Some("1.0.0"));
    assert_count_invariants(&result);
}

#[test]
fn test_low_read_coverage_fails() {
    let scheme = build_scheme(&[("1", 5), ("2", 36)]);
    // 18 tiles at 8 and 23 at 7: 305 / 41 = 7.439
    let hits = with_frequencies(make_hits(&scheme, on_path(&["2"])), |i| {
        if i < 18 {
            8
        } else {
            7
        }
    });
    let sample = SampleEvidence::new("low", InputType::Reads, hits);
    let config = SubtypingConfig::from_overrides(&ParamOverrides {
        min_kmer_freq: Some(1),
        ..ParamOverrides::default()
    })
    .unwrap();

    let result = run(&scheme, &sample, config);

    assert_eq!(result.subtype.as_deref(), Some("2"));
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result
        .qc_message
        .contains("Low coverage for all kmers (7.439 < 20 expected)"));
    assert!((result.avg_tile_coverage.unwrap() - 305.0 / 41.0).abs() < 1e-9);
}

#[test]
fn test_low_frequency_tiles_are_filtered_as_missing() {
    let scheme = build_scheme(&[("1", 10), ("2", 10)]);
    // half the tiles fall under the default min_kmer_freq of 8
    let hits = with_frequencies(make_hits(&scheme, on_path(&["2"])), |i| {
        if i % 2 == 0 {
            30
        } else {
            3
        }
    });
    let sample = SampleEvidence::new("sparse", InputType::Reads, hits);

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert_eq!(result.n_tiles_matching_all, 10);
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result.qc_message.contains(MISSING_TILES_ERROR));
    assert!(result
        .qc_message
        .contains("Okay coverage depth (30.0 >= 20.0 expected)"));
    assert!(result
        .qc_message
        .contains("10 tile(s) outside the accepted frequency window were not counted."));
}

#[test]
fn test_branching_read_evidence_is_ambiguous() {
    let scheme = build_scheme(&[("1", 10), ("2", 10), ("2.1", 10)]);
    let hits = with_frequencies(
        make_hits(&scheme, on_path(&["1", "2", "2.1"])),
        |_| 50,
    );
    let sample = SampleEvidence::new("replicates", InputType::Reads, hits)
        .with_source_file("reads_1.fastq;reads_2.fastq");

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert!(!result.are_subtypes_consistent);
    assert_eq!(result.inconsistent_subtypes, vec!["1", "2", "2.1"]);
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result.qc_message.contains(AMBIGUOUS_RESULTS_ERROR));
    assert!(result.qc_message.contains("Mixed subtypes found: \"1; 2; 2.1\""));
    assert_count_invariants(&result);
}

#[test]
fn test_tied_branches_report_common_ancestor() {
    let scheme = build_scheme(&[("1", 4), ("2", 4), ("2.1", 4), ("2.2", 4)]);
    let sample = SampleEvidence::new(
        "tied",
        InputType::Contigs,
        make_hits(&scheme, on_path(&["2", "2.1", "2.2"])),
    );

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert_eq!(result.subtype.as_deref(), Some("2"));
    assert_eq!(result.inconsistent_subtypes, vec!["2.1", "2.2"]);
    assert_eq!(result.qc_status, QcStatus::Fail);
}

#[test]
fn test_under_supported_subtype_is_intermediate() {
    let scheme = build_scheme(&[("1", 5), ("2", 4), ("2.1", 6)]);
    let hits = make_hits(&scheme, |label, i| match label {
        "2" => Allele::Positive,
        "2.1" if i < 3 => Allele::Positive,
        _ => Allele::Negative,
    });
    let sample = SampleEvidence::new("intermediate", InputType::Contigs, hits);

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert_eq!(result.subtype.as_deref(), Some("2.1"));
    assert_eq!(result.qc_status, QcStatus::Warning);
    assert!(result.is_intermediate_subtype);
    assert!(result.qc_message.starts_with(&format!(
        "WARNING: {INTERMEDIATE_SUBTYPE_WARNING}"
    )));
    assert!(result
        .qc_message
        .contains("Total subtype matches observed (n=3) vs expected (n=6)"));
    assert_count_invariants(&result);
}

#[test]
fn test_both_alleles_at_a_site_fail_as_mixed() {
    let scheme = build_scheme(&[("1", 3), ("1.1", 4), ("2", 3)]);
    let hits = make_hits(&scheme, |label, i| match label {
        "1" => Allele::Positive,
        "1.1" if i < 2 => Allele::Both,
        "1.1" => Allele::Positive,
        _ => Allele::Negative,
    });
    let sample = SampleEvidence::new("mixed", InputType::Contigs, hits);

    let result = run(&scheme, &sample, SubtypingConfig::default());

    // "1.1" sites are numbered 4000..7000; the first two carry both alleles
    assert!(!result.are_subtypes_consistent);
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result.qc_message.contains(
        "FAIL: Mixed subtype; the positive and negative kmers were found for the same target sites 4000, 5000, 4000, 5000 for subtype \"1.1\"."
    ));
    assert!(result.qc_message.contains(
        "Mixed Sample Error 2: negative kmers contradict the called subtype \"1.1\" at target sites 4000, 5000."
    ));
    assert_count_invariants(&result);
}

#[test]
fn test_mixed_sites_do_not_hide_missing_sites() {
    let scheme = build_scheme(&[("1", 10)]);
    let hits = make_hits(&scheme, |_, i| {
        if i < 5 {
            Allele::Both
        } else {
            Allele::Missing
        }
    });
    let sample = SampleEvidence::new("half-mixed", InputType::Contigs, hits);

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert_eq!(result.n_tiles_matching_all, 10);
    assert_eq!(result.n_tiles_matching_all_expected, 10);
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result.qc_message.starts_with(&format!(
        "FAIL: {MISSING_TILES_ERROR}: 50.00% missing tiles"
    )));
    assert!(result.qc_message.contains("Mixed subtype;"));
}

#[test]
fn test_missing_downstream_tiles_are_unconfident() {
    let scheme = build_scheme(&[
        ("1", 3),
        ("2", 3),
        ("2.1", 3),
        ("2.1.5", 2),
        ("2.1.5.4", 2),
        ("2.1.5.4.1", 3),
        ("2.1.5.4.2", 3),
    ]);
    let hits = make_hits(&scheme, |label, _| match label {
        "1" => Allele::Negative,
        "2.1.5.4.1" | "2.1.5.4.2" => Allele::Missing,
        _ => Allele::Positive,
    });
    let sample = SampleEvidence::new("unconfident", InputType::Contigs, hits);

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert_eq!(result.subtype.as_deref(), Some("2.1.5.4"));
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result.qc_message.contains(UNCONFIDENT_RESULTS_ERROR));
    assert!(result.qc_message.contains("kmers for downstream subtype(s)"));
    assert!(result.qc_message.contains("'2.1.5.4.1'"));
    assert!(result.qc_message.contains("'2.1.5.4.2'"));
}

#[test]
fn test_skipped_hierarchy_levels_are_unconfident() {
    let scheme = build_scheme(&[
        ("1", 3),
        ("2", 3),
        ("2.1", 3),
        ("2.1.1", 3),
        ("2.1.1.1", 3),
    ]);
    let sample = SampleEvidence::new(
        "missing-levels",
        InputType::Contigs,
        make_hits(&scheme, on_path(&["2", "2.1.1.1"])),
    );

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert_eq!(result.subtype.as_deref(), Some("2"));
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result.qc_message.contains(UNCONFIDENT_RESULTS_ERROR));
    assert!(result
        .qc_message
        .contains("kmers for nested hierarchical subtype(s) \"2.1; 2.1.1\""));
}

#[test]
fn test_no_positive_tiles_is_no_result() {
    let scheme = build_scheme(&[("1", 3), ("2", 3)]);
    let sample = SampleEvidence::new(
        "negative-only",
        InputType::Contigs,
        make_hits(&scheme, |_, _| Allele::Negative),
    );

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert!(result.subtype.is_none());
    assert!(result.are_subtypes_consistent);
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert_eq!(result.qc_message, format!("FAIL: {NO_SUBTYPE_RESULT}"));
}

#[test]
fn test_tie_between_root_subtypes_fails() {
    let scheme = build_scheme(&[("1", 1), ("2", 1)]);
    let hits = with_frequencies(make_hits(&scheme, |_, _| Allele::Positive), |_| 40);
    let sample = SampleEvidence::new("two-roots", InputType::Reads, hits);

    let result = run(&scheme, &sample, SubtypingConfig::default());

    assert!(result.subtype.is_none());
    assert!(!result.are_subtypes_consistent);
    assert_eq!(result.qc_status, QcStatus::Fail);
    assert!(result
        .qc_message
        .starts_with(&format!("FAIL: {NO_SUBTYPE_RESULT}")));
    assert!(result.qc_message.contains("Mixed subtypes found: \"1; 2\""));
}

#[test]
fn test_batch_matches_single_sample_runs() {
    let scheme = heidelberg_like_scheme();
    let samples = vec![
        SampleEvidence::new(
            "a",
            InputType::Contigs,
            make_hits(&scheme, on_path(HEIDELBERG_PATH)),
        ),
        SampleEvidence::new("b", InputType::Contigs, vec![TileHit::new("not-a-tile")]),
        SampleEvidence::new(
            "c",
            InputType::Contigs,
            make_hits(&scheme, on_path(&["1"])),
        ),
    ];

    let engine = SubtypingEngine::new(&scheme, SubtypingConfig::default()).unwrap();
    let batch = engine.subtype_samples(&samples, 3).unwrap();
    let single: Vec<SubtypeResult> = samples.iter().map(|s| engine.subtype_sample(s)).collect();

    assert_eq!(batch, single);
    assert_eq!(batch[1].qc_status, QcStatus::Fail);
    assert!(batch[1].qc_message.starts_with("FAIL: Error: "));
    assert_eq!(batch[2].subtype.as_deref(), Some("1"));
}
