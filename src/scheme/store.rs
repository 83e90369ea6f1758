use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::core::tile::Tile;
use crate::core::types::Polarity;
use crate::parsing::{fasta, ParseError};
use crate::scheme::hierarchy::{Hierarchy, NodeId};
use crate::utils::validation::is_valid_subtype_label;

#[derive(Error, Debug)]
pub enum SchemeError {
    #[error("Failed to read scheme: {0}")]
    Parse(#[from] ParseError),

    #[error("Scheme contains no tiles")]
    Empty,

    #[error("Duplicate tile id '{0}' in scheme")]
    DuplicateTileId(String),

    #[error(
        "Target site {target_site} has more than one {polarity} tile for subtype '{subtype}'"
    )]
    DuplicateAllele {
        target_site: u64,
        subtype: String,
        polarity: Polarity,
    },

    #[error("Invalid subtype label '{0}'")]
    InvalidSubtype(String),
}

/// A target site for one subtype label, with its (up to) two allele tiles
#[derive(Debug, Clone)]
pub struct TargetSite {
    pub position: u64,
    pub node: NodeId,
    /// Index of the positive tile in [`Scheme::tiles`]
    pub positive: Option<usize>,
    /// Index of the negative tile in [`Scheme::tiles`]
    pub negative: Option<usize>,
}

impl TargetSite {
    /// Tile indices present for this site
    pub fn tiles(&self) -> impl Iterator<Item = usize> {
        self.positive.into_iter().chain(self.negative)
    }
}

/// Tile counts per category.
///
/// Used both for observed matches and for the expected counts derived from
/// the scheme, where one allele is expected per target site, `positive` covers
/// every node on the called path and `subtype` the called node itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCounts {
    pub all: usize,
    pub positive: usize,
    pub negative: usize,
    pub subtype: usize,
}

/// A loaded subtyping scheme. Read-only once built.
#[derive(Debug, Clone)]
pub struct Scheme {
    pub name: String,
    pub version: Option<String>,
    tiles: Vec<Tile>,
    tile_index: HashMap<String, usize>,
    /// Hierarchy node of each tile, aligned with `tiles`
    tile_nodes: Vec<NodeId>,
    sites: Vec<TargetSite>,
    /// Indices into `sites`, per hierarchy node
    sites_by_node: Vec<Vec<usize>>,
    hierarchy: Hierarchy,
}

impl Scheme {
    /// Build a scheme from its tiles, validating them
    ///
    /// # Errors
    ///
    /// Returns `SchemeError::Empty` for an empty tile list,
    /// `SchemeError::DuplicateTileId` / `SchemeError::DuplicateAllele` for
    /// repeated tiles, or `SchemeError::InvalidSubtype` for malformed labels.
    pub fn new(name: impl Into<String>, tiles: Vec<Tile>) -> Result<Self, SchemeError> {
        if tiles.is_empty() {
            return Err(SchemeError::Empty);
        }

        let mut hierarchy = Hierarchy::new();
        let mut tile_index = HashMap::with_capacity(tiles.len());
        let mut tile_nodes = Vec::with_capacity(tiles.len());
        let mut sites: Vec<TargetSite> = Vec::new();
        let mut site_lookup: HashMap<(u64, NodeId), usize> = HashMap::new();

        for (i, tile) in tiles.iter().enumerate() {
            if !is_valid_subtype_label(&tile.subtype) {
                return Err(SchemeError::InvalidSubtype(tile.subtype.clone()));
            }
            if tile_index.insert(tile.id.clone(), i).is_some() {
                return Err(SchemeError::DuplicateTileId(tile.id.clone()));
            }

            let node = hierarchy.insert(&tile.subtype);
            let site_idx = *site_lookup
                .entry((tile.target_site, node))
                .or_insert_with(|| {
                    sites.push(TargetSite {
                        position: tile.target_site,
                        node,
                        positive: None,
                        negative: None,
                    });
                    sites.len() - 1
                });

            let slot = match tile.polarity {
                Polarity::Positive => &mut sites[site_idx].positive,
                Polarity::Negative => &mut sites[site_idx].negative,
            };
            if slot.is_some() {
                return Err(SchemeError::DuplicateAllele {
                    target_site: tile.target_site,
                    subtype: tile.subtype.clone(),
                    polarity: tile.polarity,
                });
            }
            *slot = Some(i);

            tile_nodes.push(node);
        }

        let mut sites_by_node = vec![Vec::new(); hierarchy.len()];
        for (i, site) in sites.iter().enumerate() {
            sites_by_node[site.node].push(i);
        }

        Ok(Self {
            name: name.into(),
            version: None,
            tiles,
            tile_index,
            tile_nodes,
            sites,
            sites_by_node,
            hierarchy,
        })
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Load a scheme from a FASTA file of tiles; the name is the file stem
    ///
    /// # Errors
    ///
    /// Returns `SchemeError::Parse` if the file cannot be parsed, or any of the
    /// validation errors of [`Scheme::new`].
    pub fn load(path: &Path) -> Result<Self, SchemeError> {
        let tiles = fasta::parse_scheme_file(path)?;
        let name = scheme_name_from_path(path);
        let scheme = Self::new(name, tiles)?;

        info!(
            "Loaded scheme '{}': {} tiles, {} target sites, {} subtypes",
            scheme.name,
            scheme.tiles.len(),
            scheme.sites.len(),
            scheme.hierarchy.len()
        );
        Ok(scheme)
    }

    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Position of a tile id in [`Scheme::tiles`]
    #[must_use]
    pub fn tile_index(&self, tile_id: &str) -> Option<usize> {
        self.tile_index.get(tile_id).copied()
    }

    #[must_use]
    pub fn tile_node(&self, tile: usize) -> NodeId {
        self.tile_nodes[tile]
    }

    #[must_use]
    pub fn sites(&self) -> &[TargetSite] {
        &self.sites
    }

    /// Target sites defined for one hierarchy node
    pub fn sites_for_node(&self, node: NodeId) -> impl Iterator<Item = &TargetSite> {
        self.sites_by_node[node].iter().map(|&i| &self.sites[i])
    }

    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    #[must_use]
    pub fn n_target_sites(&self) -> usize {
        self.sites.len()
    }

    /// Number of target sites defined for `node`; zero for implicit nodes
    #[must_use]
    pub fn n_sites_for_node(&self, node: NodeId) -> usize {
        self.sites_by_node[node].len()
    }

    /// Does the scheme define any tiles for `node`?
    #[must_use]
    pub fn has_tiles(&self, node: NodeId) -> bool {
        !self.sites_by_node[node].is_empty()
    }

    /// Expected counts for a called subtype (or no call)
    #[must_use]
    pub fn expected_counts(&self, called: Option<NodeId>) -> TileCounts {
        let all = self.n_target_sites();
        let Some(node) = called else {
            return TileCounts {
                all,
                negative: all,
                ..TileCounts::default()
            };
        };

        let positive: usize = self
            .hierarchy
            .path(node)
            .into_iter()
            .map(|n| self.n_sites_for_node(n))
            .sum();

        TileCounts {
            all,
            positive,
            negative: all.saturating_sub(positive),
            subtype: self.n_sites_for_node(node),
        }
    }
}

fn scheme_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut name = file_name.as_str();
    for ext in [".gz", ".bgz", ".fasta", ".fa", ".fna"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped;
        }
    }
    name.to_string()
}
