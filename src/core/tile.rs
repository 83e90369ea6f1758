use serde::{Deserialize, Serialize};

use crate::core::types::{InputType, Polarity};

/// A single scheme tile: a short diagnostic sequence tied to one target site
/// and one subtype label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Unique identifier within the scheme (e.g. `negative3872935-2.1.1.2`)
    pub id: String,

    /// Genomic position this tile is diagnostic for
    pub target_site: u64,

    /// Dot-delimited hierarchical subtype label (e.g. `2.1.1.2`)
    pub subtype: String,

    /// Whether finding the tile supports or refutes `subtype`
    pub polarity: Polarity,
}

impl Tile {
    pub fn new(
        id: impl Into<String>,
        target_site: u64,
        subtype: impl Into<String>,
        polarity: Polarity,
    ) -> Self {
        Self {
            id: id.into(),
            target_site,
            subtype: subtype.into(),
            polarity,
        }
    }

    /// Positive tile using the conventional `{site}-{subtype}` id
    pub fn positive(target_site: u64, subtype: impl Into<String>) -> Self {
        let subtype = subtype.into();
        Self::new(
            format!("{target_site}-{subtype}"),
            target_site,
            subtype,
            Polarity::Positive,
        )
    }

    /// Negative tile using the conventional `negative{site}-{subtype}` id
    pub fn negative(target_site: u64, subtype: impl Into<String>) -> Self {
        let subtype = subtype.into();
        Self::new(
            format!("negative{target_site}-{subtype}"),
            target_site,
            subtype,
            Polarity::Negative,
        )
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        matches!(self.polarity, Polarity::Positive)
    }
}

/// One tile found in a sample by the upstream search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileHit {
    pub tile_id: String,

    /// K-mer frequency of the tile; only reported for read input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
}

impl TileHit {
    pub fn new(tile_id: impl Into<String>) -> Self {
        Self {
            tile_id: tile_id.into(),
            frequency: None,
        }
    }

    #[must_use]
    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.frequency = Some(frequency);
        self
    }
}

/// All tile evidence collected for one sample (one genome)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleEvidence {
    pub sample: String,

    /// File(s) the evidence was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    pub input_type: InputType,

    /// Tiles found in the sample; tiles not listed were not found
    pub hits: Vec<TileHit>,
}

impl SampleEvidence {
    pub fn new(sample: impl Into<String>, input_type: InputType, hits: Vec<TileHit>) -> Self {
        Self {
            sample: sample.into(),
            source_file: None,
            input_type,
            hits,
        }
    }

    #[must_use]
    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }
}

/// Tile Match Record: one row per scheme tile searched against a sample.
///
/// Rows are aligned with the scheme's tile order, so `index` is also the
/// tile's position in [`crate::scheme::store::Scheme::tiles`].
#[derive(Debug, Clone, Copy)]
pub struct TileMatch<'s> {
    pub index: usize,
    pub tile: &'s Tile,
    pub matched: bool,
    pub frequency: Option<u64>,
}

impl TileMatch<'_> {
    #[must_use]
    pub fn tile_id(&self) -> &str {
        &self.tile.id
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.tile.is_positive()
    }
}
