use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::result::SubtypeResult;
use crate::core::tile::{SampleEvidence, TileMatch};
use crate::core::types::InputType;
use crate::scheme::store::Scheme;
use crate::subtyping::coverage::{self, CoverageStats};
use crate::subtyping::params::{ParamsError, SubtypingConfig};
use crate::subtyping::qc::{self, QcContext, QcVerdict};
use crate::subtyping::resolver::{self, Resolution};

/// Problems with one sample's evidence; fatal to that sample only
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EvidenceError {
    #[error("tile '{tile_id}' is not part of scheme '{scheme}'")]
    UnknownTile { tile_id: String, scheme: String },

    #[error("tile '{0}' is listed more than once")]
    DuplicateTile(String),

    #[error("tile '{0}' has no frequency but the sample is read input")]
    MissingFrequency(String),

    #[error("tile '{0}' has a frequency but the sample is contig input")]
    UnexpectedFrequency(String),
}

/// Runs the single-sample pipeline against one scheme
pub struct SubtypingEngine<'a> {
    scheme: &'a Scheme,
    config: SubtypingConfig,
}

impl<'a> SubtypingEngine<'a> {
    /// Create an engine, rejecting out-of-range parameters up front
    ///
    /// # Errors
    ///
    /// Returns a `ParamsError` if either parameter set is invalid.
    pub fn new(scheme: &'a Scheme, config: SubtypingConfig) -> Result<Self, ParamsError> {
        config.validate()?;
        Ok(Self { scheme, config })
    }

    /// Subtype one sample. Evidence errors become a FAIL result.
    #[must_use]
    pub fn subtype_sample(&self, evidence: &SampleEvidence) -> SubtypeResult {
        match self.try_subtype_sample(evidence) {
            Ok(result) => result,
            Err(e) => {
                warn!("Sample '{}' failed: {e}", evidence.sample);
                SubtypeResult::failed(evidence, self.scheme, e.to_string())
            }
        }
    }

    /// Subtype one sample, surfacing evidence errors to the caller
    ///
    /// # Errors
    ///
    /// Returns an `EvidenceError` if the evidence does not fit the scheme.
    pub fn try_subtype_sample(
        &self,
        evidence: &SampleEvidence,
    ) -> Result<SubtypeResult, EvidenceError> {
        let params = self.config.params(evidence.input_type);
        let mut matches = self.build_matches(evidence)?;

        let coverage = match evidence.input_type {
            InputType::Reads => {
                let n_filtered = coverage::apply_frequency_filter(&mut matches, params);
                Some(coverage::analyze(&matches, n_filtered))
            }
            InputType::Contigs => None,
        };

        let resolution = resolver::resolve(self.scheme, &matches);
        let verdict = qc::evaluate(&QcContext {
            resolution: &resolution,
            coverage: coverage.as_ref(),
            params,
            input_type: evidence.input_type,
        });

        debug!(
            "Sample '{}': subtype {:?}, QC {}",
            evidence.sample, resolution.subtype, verdict.status
        );

        Ok(self.assemble(evidence, resolution, coverage.as_ref(), verdict))
    }

    /// One match record per scheme tile, marking the tiles found in the sample
    ///
    /// # Errors
    ///
    /// Returns an `EvidenceError` for unknown or repeated tiles, or when the
    /// presence of frequencies does not fit the input type.
    pub fn build_matches(
        &self,
        evidence: &SampleEvidence,
    ) -> Result<Vec<TileMatch<'a>>, EvidenceError> {
        let mut matches: Vec<TileMatch<'a>> = self
            .scheme
            .tiles()
            .iter()
            .enumerate()
            .map(|(index, tile)| TileMatch {
                index,
                tile,
                matched: false,
                frequency: None,
            })
            .collect();

        for hit in &evidence.hits {
            let index =
                self.scheme
                    .tile_index(&hit.tile_id)
                    .ok_or_else(|| EvidenceError::UnknownTile {
                        tile_id: hit.tile_id.clone(),
                        scheme: self.scheme.name.clone(),
                    })?;

            match (evidence.input_type, hit.frequency) {
                (InputType::Reads, None) => {
                    return Err(EvidenceError::MissingFrequency(hit.tile_id.clone()))
                }
                (InputType::Contigs, Some(_)) => {
                    return Err(EvidenceError::UnexpectedFrequency(hit.tile_id.clone()))
                }
                _ => {}
            }

            let record = &mut matches[index];
            if record.matched {
                return Err(EvidenceError::DuplicateTile(hit.tile_id.clone()));
            }
            record.matched = true;
            record.frequency = hit.frequency;
        }

        Ok(matches)
    }

    /// Subtype every sample on a pool of `threads` workers (0 = all cores).
    ///
    /// Results come back in input order. A failing sample never affects its
    /// siblings.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be built.
    pub fn subtype_samples(
        &self,
        samples: &[SampleEvidence],
        threads: usize,
    ) -> Result<Vec<SubtypeResult>, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        debug!(
            "Subtyping {} sample(s) on {} thread(s)",
            samples.len(),
            pool.current_num_threads()
        );

        Ok(pool.install(|| {
            samples
                .par_iter()
                .map(|sample| self.subtype_sample(sample))
                .collect::<Vec<_>>()
        }))
    }

    fn assemble(
        &self,
        evidence: &SampleEvidence,
        resolution: Resolution,
        coverage: Option<&CoverageStats>,
        verdict: QcVerdict,
    ) -> SubtypeResult {
        let Resolution {
            subtype,
            all_subtypes_matched,
            are_subtypes_consistent,
            inconsistent_subtypes,
            tiles_matching_subtype,
            observed,
            expected,
            ..
        } = resolution;

        SubtypeResult {
            sample: evidence.sample.clone(),
            scheme: self.scheme.name.clone(),
            scheme_version: self.scheme.version.clone(),
            source_file: evidence.source_file.clone(),
            input_type: evidence.input_type,
            subtype,
            are_subtypes_consistent,
            inconsistent_subtypes,
            all_subtypes_matched,
            tiles_matching_subtype,
            n_tiles_matching_all: observed.all,
            n_tiles_matching_all_expected: expected.all,
            n_tiles_matching_positive: observed.positive,
            n_tiles_matching_positive_expected: expected.positive,
            n_tiles_matching_negative: observed.negative,
            n_tiles_matching_negative_expected: expected.negative,
            n_tiles_matching_subtype: observed.subtype,
            n_tiles_matching_subtype_expected: expected.subtype,
            avg_tile_coverage: coverage.map(|c| c.avg_tile_coverage),
            is_intermediate_subtype: verdict.is_intermediate,
            qc_status: verdict.status,
            qc_message: verdict.message,
        }
    }
}
