//! Coverage/frequency analysis for read input.
//!
//! Tiles whose frequency falls outside `[min_kmer_freq, max_kmer_freq]` are
//! removed from the match set before resolution, so a tile under
//! `min_kmer_freq` counts as not found. The remaining matched tiles give the
//! average tile coverage used by the low coverage QC check.

use tracing::debug;

use crate::core::tile::TileMatch;
use crate::subtyping::params::SubtypingParams;

/// Helper function to convert usize count to f64 with explicit precision loss allowance
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

#[inline]
fn freq_to_f64(freq: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        freq as f64
    }
}

/// Coverage statistics over the matched tiles of one sample
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageStats {
    /// Mean frequency across matched tiles (0.0 when none matched)
    pub avg_tile_coverage: f64,
    /// Matched tiles remaining after frequency filtering
    pub n_matched_tiles: usize,
    /// Tiles dropped by the frequency window
    pub n_filtered_tiles: usize,
}

/// Unmark tiles whose frequency falls outside the configured window.
///
/// Returns the number of tiles unmarked. Applied exactly once per sample,
/// before resolution.
pub fn apply_frequency_filter(matches: &mut [TileMatch<'_>], params: &SubtypingParams) -> usize {
    let mut n_filtered = 0;
    for m in matches.iter_mut().filter(|m| m.matched) {
        if let Some(freq) = m.frequency {
            if !params.accepts_frequency(freq) {
                m.matched = false;
                n_filtered += 1;
            }
        }
    }
    n_filtered
}

/// Compute coverage statistics over already-filtered matches
#[must_use]
pub fn analyze(matches: &[TileMatch<'_>], n_filtered_tiles: usize) -> CoverageStats {
    let freqs: Vec<u64> = matches
        .iter()
        .filter(|m| m.matched)
        .filter_map(|m| m.frequency)
        .collect();

    let avg_tile_coverage = if freqs.is_empty() {
        0.0
    } else {
        freqs.iter().copied().map(freq_to_f64).sum::<f64>() / count_to_f64(freqs.len())
    };

    let stats = CoverageStats {
        avg_tile_coverage,
        n_matched_tiles: freqs.len(),
        n_filtered_tiles,
    };

    debug!(
        "Coverage: avg {:.3} over {} tiles ({} filtered)",
        stats.avg_tile_coverage, stats.n_matched_tiles, stats.n_filtered_tiles
    );

    stats
}
