use thiserror::Error;

use crate::core::types::InputType;
use crate::utils::validation::{is_non_negative, is_proportion};

#[derive(Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("{name} must be between 0.0 and 1.0 inclusive, got {value}")]
    NotAProportion { name: &'static str, value: f64 },

    #[error("{name} must be 0 or greater, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("min_kmer_freq ({min}) must not exceed max_kmer_freq ({max})")]
    InvertedFrequencyWindow { min: u64, max: u64 },
}

/// Thresholds consumed by the coverage analyzer and the QC rule engine
#[derive(Debug, Clone, PartialEq)]
pub struct SubtypingParams {
    /// Tiles found fewer times than this are treated as not found (reads only)
    pub min_kmer_freq: Option<u64>,
    /// Tiles found more times than this are treated as not found (reads only)
    pub max_kmer_freq: Option<u64>,
    /// Average tile frequency below this fails QC (reads only)
    pub low_coverage_threshold: f64,
    /// Maximum proportion of target sites allowed without any allele found
    pub max_missing_tiles: f64,
    /// Conflicting tiles needed before a branching conflict fails QC
    pub min_ambiguous_tiles: usize,
    /// Average tile frequency below this is a warning (reads only)
    pub low_coverage_warning: f64,
    /// Proportion of subtype tiles that may be missing before the call is
    /// flagged as a possible intermediate subtype
    pub max_intermediate_tiles: f64,
}

impl SubtypingParams {
    /// Defaults for read input
    #[must_use]
    pub fn reads() -> Self {
        Self {
            min_kmer_freq: Some(8),
            max_kmer_freq: Some(1000),
            low_coverage_threshold: 20.0,
            max_missing_tiles: 0.05,
            min_ambiguous_tiles: 3,
            low_coverage_warning: 20.0,
            max_intermediate_tiles: 0.05,
        }
    }

    /// Defaults for assembled contig input
    #[must_use]
    pub fn contigs() -> Self {
        Self {
            min_kmer_freq: None,
            max_kmer_freq: None,
            low_coverage_threshold: 0.0,
            max_missing_tiles: 0.05,
            min_ambiguous_tiles: 0,
            low_coverage_warning: 0.0,
            max_intermediate_tiles: 0.05,
        }
    }

    #[must_use]
    pub fn for_input_type(input_type: InputType) -> Self {
        match input_type {
            InputType::Reads => Self::reads(),
            InputType::Contigs => Self::contigs(),
        }
    }

    /// Apply user overrides on top of these values
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ParamOverrides) -> Self {
        if let Some(v) = overrides.min_kmer_freq {
            self.min_kmer_freq = Some(v);
        }
        if let Some(v) = overrides.max_kmer_freq {
            self.max_kmer_freq = Some(v);
        }
        if let Some(v) = overrides.low_coverage_threshold {
            self.low_coverage_threshold = v;
        }
        if let Some(v) = overrides.max_missing_tiles {
            self.max_missing_tiles = v;
        }
        if let Some(v) = overrides.min_ambiguous_tiles {
            self.min_ambiguous_tiles = v;
        }
        if let Some(v) = overrides.low_coverage_warning {
            self.low_coverage_warning = v;
        }
        if let Some(v) = overrides.max_intermediate_tiles {
            self.max_intermediate_tiles = v;
        }
        self
    }

    /// Reject out-of-range thresholds
    ///
    /// # Errors
    ///
    /// Returns the first `ParamsError` found.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [
            ("max_missing_tiles", self.max_missing_tiles),
            ("max_intermediate_tiles", self.max_intermediate_tiles),
        ] {
            if !is_proportion(value) {
                return Err(ParamsError::NotAProportion { name, value });
            }
        }

        for (name, value) in [
            ("low_coverage_threshold", self.low_coverage_threshold),
            ("low_coverage_warning", self.low_coverage_warning),
        ] {
            if !is_non_negative(value) {
                return Err(ParamsError::Negative { name, value });
            }
        }

        if let (Some(min), Some(max)) = (self.min_kmer_freq, self.max_kmer_freq) {
            if min > max {
                return Err(ParamsError::InvertedFrequencyWindow { min, max });
            }
        }

        Ok(())
    }

    /// Is a tile frequency inside the `[min_kmer_freq, max_kmer_freq]` window?
    #[must_use]
    pub fn accepts_frequency(&self, frequency: u64) -> bool {
        self.min_kmer_freq.map_or(true, |min| frequency >= min)
            && self.max_kmer_freq.map_or(true, |max| frequency <= max)
    }
}

/// Caller-supplied overrides; unset fields keep the input-type default
#[derive(Debug, Clone, Default)]
pub struct ParamOverrides {
    pub min_kmer_freq: Option<u64>,
    pub max_kmer_freq: Option<u64>,
    pub low_coverage_threshold: Option<f64>,
    pub max_missing_tiles: Option<f64>,
    pub min_ambiguous_tiles: Option<usize>,
    pub low_coverage_warning: Option<f64>,
    pub max_intermediate_tiles: Option<f64>,
}

/// Parameters for each input type, resolved and validated before a run
#[derive(Debug, Clone, PartialEq)]
pub struct SubtypingConfig {
    pub contigs: SubtypingParams,
    pub reads: SubtypingParams,
}

impl Default for SubtypingConfig {
    fn default() -> Self {
        Self {
            contigs: SubtypingParams::contigs(),
            reads: SubtypingParams::reads(),
        }
    }
}

impl SubtypingConfig {
    /// Input-type defaults with the same overrides applied to both
    ///
    /// # Errors
    ///
    /// Returns a `ParamsError` if any resulting threshold is out of range.
    pub fn from_overrides(overrides: &ParamOverrides) -> Result<Self, ParamsError> {
        let config = Self {
            contigs: SubtypingParams::contigs().with_overrides(overrides),
            reads: SubtypingParams::reads().with_overrides(overrides),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns a `ParamsError` if either parameter set is out of range.
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.contigs.validate()?;
        self.reads.validate()
    }

    #[must_use]
    pub fn params(&self, input_type: InputType) -> &SubtypingParams {
        match input_type {
            InputType::Contigs => &self.contigs,
            InputType::Reads => &self.reads,
        }
    }
}
