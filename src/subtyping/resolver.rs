//! Subtype Resolver: turns one sample's matched tiles into a hierarchical call.
//!
//! The resolver works on node indices of the scheme's [`Hierarchy`] and never
//! re-parses labels. It is pure: the same matches always give the same
//! [`Resolution`].

use std::collections::HashMap;

use tracing::debug;

use crate::core::tile::TileMatch;
use crate::scheme::hierarchy::{compare_labels, Hierarchy, NodeId};
use crate::scheme::store::{Scheme, TileCounts};

/// Outcome of picking the deepest supported node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtypeCall {
    /// No positive tile matched
    NoCall,
    /// A single deepest supported node
    Called(NodeId),
    /// Several divergent nodes tied at the deepest supported level
    Ambiguous {
        tied: Vec<NodeId>,
        common_ancestor: Option<NodeId>,
    },
}

impl SubtypeCall {
    /// Node reported as the subtype, if any
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::NoCall => None,
            Self::Called(node) => Some(*node),
            Self::Ambiguous {
                common_ancestor, ..
            } => *common_ancestor,
        }
    }

    #[must_use]
    pub fn is_no_call(&self) -> bool {
        matches!(self, Self::NoCall)
    }
}

/// A target site where both the positive and the negative tile matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedTarget {
    pub target_site: u64,
    pub subtype: String,
    /// The site's subtype lies on the called path
    pub on_called_path: bool,
}

/// Data coverage of the subtypes below the called node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownstreamCoverage {
    /// Target sites defined for descendants of the called node
    pub n_sites: usize,
    /// Those sites where neither allele matched
    pub n_missing_sites: usize,
    /// Descendant labels with at least one missing site, in label order
    pub missing_subtypes: Vec<String>,
}

impl DownstreamCoverage {
    /// Proportion of downstream sites without any allele found
    #[must_use]
    pub fn missing_proportion(&self) -> f64 {
        if self.n_sites == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.n_missing_sites as f64 / self.n_sites as f64
        }
    }
}

/// Everything the QC engine and the result assembler need from resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub call: SubtypeCall,
    /// Label of `call.node()`
    pub subtype: Option<String>,
    /// Labels from the root down to the called node
    pub all_subtypes_matched: Vec<String>,
    pub are_subtypes_consistent: bool,
    /// Positively supported labels on divergent branches, most conflicting first
    pub inconsistent_subtypes: Vec<String>,
    /// Matched positive tiles backing a conflicting label off the called path
    pub n_conflicting_tiles: usize,
    /// Mixed target sites in scheme order
    pub mixed_targets: Vec<MixedTarget>,
    /// Target sites where at least one allele matched
    pub n_sites_found: usize,
    /// Tiled ancestor levels skipped by a positively supported deeper label
    pub missing_nested_subtypes: Vec<String>,
    pub downstream: DownstreamCoverage,
    /// Ids of the matched positive tiles of the called node
    pub tiles_matching_subtype: Vec<String>,
    pub observed: TileCounts,
    pub expected: TileCounts,
}

/// Resolve the subtype call for one sample.
///
/// `matches` must be aligned with [`Scheme::tiles`]; tiles with
/// `matched == false` are ignored.
#[must_use]
pub fn resolve(scheme: &Scheme, matches: &[TileMatch<'_>]) -> Resolution {
    let hierarchy = scheme.hierarchy();

    let mut is_candidate = vec![false; hierarchy.len()];
    let mut observed = TileCounts::default();
    for m in matches.iter().filter(|m| m.matched) {
        observed.all += 1;
        if m.is_positive() {
            observed.positive += 1;
            is_candidate[scheme.tile_node(m.index)] = true;
        } else {
            observed.negative += 1;
        }
    }

    let mut candidates: Vec<NodeId> = (0..hierarchy.len()).filter(|&n| is_candidate[n]).collect();
    candidates.sort_by(|&a, &b| {
        hierarchy
            .depth(a)
            .cmp(&hierarchy.depth(b))
            .then_with(|| compare_labels(hierarchy.label(a), hierarchy.label(b)))
    });

    let is_fully_supported = |node: NodeId| {
        hierarchy
            .ancestors(node)
            .all(|a| is_candidate[a] || !scheme.has_tiles(a))
    };

    let call = pick_call(hierarchy, &candidates, is_fully_supported);
    let called = call.node();

    let inconsistent = find_inconsistent_subtypes(hierarchy, &candidates);
    let inconsistent_nodes: Vec<NodeId> = inconsistent
        .iter()
        .filter_map(|label| hierarchy.get(label))
        .collect();

    let on_called_path =
        |node: NodeId| called.is_some_and(|c| c == node || hierarchy.is_ancestor_of(node, c));

    let mut tiles_matching_subtype = Vec::new();
    let mut n_conflicting_tiles = 0;
    for m in matches.iter().filter(|m| m.matched && m.is_positive()) {
        let node = scheme.tile_node(m.index);
        if Some(node) == called {
            observed.subtype += 1;
            tiles_matching_subtype.push(m.tile_id().to_string());
        }
        if inconsistent_nodes.contains(&node) && !on_called_path(node) {
            n_conflicting_tiles += 1;
        }
    }

    let found = |tile: Option<usize>| tile.is_some_and(|i| matches[i].matched);
    let n_sites_found = scheme
        .sites()
        .iter()
        .filter(|site| found(site.positive) || found(site.negative))
        .count();
    let mixed_targets: Vec<MixedTarget> = scheme
        .sites()
        .iter()
        .filter(|site| found(site.positive) && found(site.negative))
        .map(|site| MixedTarget {
            target_site: site.position,
            subtype: hierarchy.label(site.node).to_string(),
            on_called_path: on_called_path(site.node),
        })
        .collect();

    let missing_nested_subtypes =
        find_missing_nested_subtypes(scheme, &candidates, &is_candidate, &is_fully_supported, called);

    let downstream = called
        .map(|node| downstream_coverage(scheme, matches, node))
        .unwrap_or_default();

    let resolution = Resolution {
        subtype: called.map(|n| hierarchy.label(n).to_string()),
        all_subtypes_matched: called
            .map(|n| {
                hierarchy
                    .path(n)
                    .into_iter()
                    .map(|p| hierarchy.label(p).to_string())
                    .collect()
            })
            .unwrap_or_default(),
        are_subtypes_consistent: inconsistent.is_empty() && mixed_targets.is_empty(),
        inconsistent_subtypes: inconsistent,
        n_conflicting_tiles,
        mixed_targets,
        n_sites_found,
        missing_nested_subtypes,
        downstream,
        tiles_matching_subtype,
        expected: scheme.expected_counts(called),
        observed,
        call,
    };

    debug!(
        "Resolved subtype {:?} from {} candidate(s); consistent: {}, {} mixed site(s)",
        resolution.subtype,
        candidates.len(),
        resolution.are_subtypes_consistent,
        resolution.mixed_targets.len()
    );

    resolution
}

/// Deepest fully supported candidate; falls back to every candidate when no
/// candidate has its whole tiled ancestry supported.
fn pick_call(
    hierarchy: &Hierarchy,
    candidates: &[NodeId],
    is_fully_supported: impl Fn(NodeId) -> bool,
) -> SubtypeCall {
    let supported: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|&n| is_fully_supported(n))
        .collect();
    let pool: &[NodeId] = if supported.is_empty() {
        candidates
    } else {
        &supported
    };

    let Some(max_depth) = pool.iter().map(|&n| hierarchy.depth(n)).max() else {
        return SubtypeCall::NoCall;
    };
    let deepest: Vec<NodeId> = pool
        .iter()
        .copied()
        .filter(|&n| hierarchy.depth(n) == max_depth)
        .collect();

    match deepest.as_slice() {
        [single] => SubtypeCall::Called(*single),
        _ => SubtypeCall::Ambiguous {
            common_ancestor: hierarchy.common_ancestor(&deepest),
            tied: deepest,
        },
    }
}

/// Labels of candidates that do not share a root-to-leaf path with every other
/// candidate.
///
/// Each divergent pair contributes both labels; labels are then ordered by how
/// many divergent pairs they take part in (ties keep first appearance). With
/// candidates `1`, `2` and `2.1` this gives `1`, `2`, `2.1`.
fn find_inconsistent_subtypes(hierarchy: &Hierarchy, candidates: &[NodeId]) -> Vec<String> {
    let mut seen: Vec<NodeId> = Vec::new();
    let mut counts: HashMap<NodeId, usize> = HashMap::new();

    for (i, &a) in candidates.iter().enumerate() {
        for &b in &candidates[i + 1..] {
            if hierarchy.on_same_path(a, b) {
                continue;
            }
            for node in [a, b] {
                let count = counts.entry(node).or_insert(0);
                if *count == 0 {
                    seen.push(node);
                }
                *count += 1;
            }
        }
    }

    // stable sort keeps first appearance among equal counts
    seen.sort_by(|a, b| counts[b].cmp(&counts[a]));
    seen.into_iter()
        .map(|n| hierarchy.label(n).to_string())
        .collect()
}

fn find_missing_nested_subtypes(
    scheme: &Scheme,
    candidates: &[NodeId],
    is_candidate: &[bool],
    is_fully_supported: impl Fn(NodeId) -> bool,
    called: Option<NodeId>,
) -> Vec<String> {
    let Some(called) = called else {
        return Vec::new();
    };
    let hierarchy = scheme.hierarchy();

    let mut missing: Vec<NodeId> = Vec::new();
    for &orphan in candidates.iter().filter(|&&n| !is_fully_supported(n)) {
        if !hierarchy.on_same_path(orphan, called) {
            continue;
        }
        for ancestor in hierarchy.ancestors(orphan) {
            if scheme.has_tiles(ancestor) && !is_candidate[ancestor] && !missing.contains(&ancestor)
            {
                missing.push(ancestor);
            }
        }
    }

    missing.sort_by(|&a, &b| {
        hierarchy
            .depth(a)
            .cmp(&hierarchy.depth(b))
            .then_with(|| compare_labels(hierarchy.label(a), hierarchy.label(b)))
    });
    missing
        .into_iter()
        .map(|n| hierarchy.label(n).to_string())
        .collect()
}

fn downstream_coverage(
    scheme: &Scheme,
    matches: &[TileMatch<'_>],
    node: NodeId,
) -> DownstreamCoverage {
    let hierarchy = scheme.hierarchy();
    let mut coverage = DownstreamCoverage::default();

    for descendant in hierarchy.descendants(node) {
        let mut any_missing = false;
        for site in scheme.sites_for_node(descendant) {
            coverage.n_sites += 1;
            if !site.tiles().any(|i| matches[i].matched) {
                coverage.n_missing_sites += 1;
                any_missing = true;
            }
        }
        if any_missing {
            coverage
                .missing_subtypes
                .push(hierarchy.label(descendant).to_string());
        }
    }

    coverage
        .missing_subtypes
        .sort_by(|a, b| compare_labels(a, b));
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tile::Tile;

    /// Sites: 100 "1", 200 "2", 300/400 "2.1", 500 "2.1.1.1" ("2.1.1" implicit)
    fn make_scheme() -> Scheme {
        let mut tiles = Vec::new();
        for (site, label) in [(100, "1"), (200, "2"), (300, "2.1"), (400, "2.1"), (500, "2.1.1.1")] {
            tiles.push(Tile::positive(site, label));
            tiles.push(Tile::negative(site, label));
        }
        Scheme::new("test", tiles).unwrap()
    }

    fn make_matches<'a>(scheme: &'a Scheme, found: &[&str]) -> Vec<TileMatch<'a>> {
        scheme
            .tiles()
            .iter()
            .enumerate()
            .map(|(index, tile)| TileMatch {
                index,
                tile,
                matched: found.contains(&tile.id.as_str()),
                frequency: None,
            })
            .collect()
    }

    #[test]
    fn test_deepest_fully_supported_path_is_called() {
        let scheme = make_scheme();
        let matches = make_matches(
            &scheme,
            &["negative100-1", "200-2", "300-2.1", "400-2.1", "negative500-2.1.1.1"],
        );
        let res = resolve(&scheme, &matches);

        assert_eq!(res.subtype.as_deref(), Some("2.1"));
        assert_eq!(res.all_subtypes_matched, vec!["2", "2.1"]);
        assert!(res.are_subtypes_consistent);
        assert_eq!(res.tiles_matching_subtype, vec!["300-2.1", "400-2.1"]);
        assert_eq!(
            res.observed,
            TileCounts {
                all: 5,
                positive: 3,
                negative: 2,
                subtype: 2
            }
        );
        assert_eq!(res.expected.positive, 3);
        assert_eq!(res.downstream.n_sites, 1);
        assert_eq!(res.downstream.n_missing_sites, 0);
    }

    #[test]
    fn test_no_positive_tiles_is_no_call() {
        let scheme = make_scheme();
        let matches = make_matches(&scheme, &["negative100-1", "negative200-2"]);
        let res = resolve(&scheme, &matches);

        assert_eq!(res.call, SubtypeCall::NoCall);
        assert!(res.subtype.is_none());
        assert!(res.are_subtypes_consistent);
        assert_eq!(res.expected.positive, 0);
    }

    #[test]
    fn test_root_only_candidate() {
        let scheme = make_scheme();
        let matches = make_matches(&scheme, &["100-1", "negative200-2"]);
        let res = resolve(&scheme, &matches);
        assert_eq!(res.subtype.as_deref(), Some("1"));
    }

    #[test]
    fn test_branching_candidates_are_inconsistent() {
        let scheme = make_scheme();
        let matches = make_matches(&scheme, &["100-1", "200-2", "300-2.1", "400-2.1"]);
        let res = resolve(&scheme, &matches);

        assert_eq!(res.inconsistent_subtypes, vec!["1", "2", "2.1"]);
        assert!(!res.are_subtypes_consistent);
        assert_eq!(res.subtype.as_deref(), Some("2.1"));
        // only the "1" tile lies off the called path
        assert_eq!(res.n_conflicting_tiles, 1);
    }

    #[test]
    fn test_tie_at_deepest_level_reports_common_ancestor() {
        let tiles = vec![
            Tile::positive(1, "2"),
            Tile::positive(2, "2.1"),
            Tile::positive(3, "2.2"),
        ];
        let scheme = Scheme::new("tie", tiles).unwrap();
        let matches = make_matches(&scheme, &["1-2", "2-2.1", "3-2.2"]);
        let res = resolve(&scheme, &matches);

        let h = scheme.hierarchy();
        assert_eq!(
            res.call,
            SubtypeCall::Ambiguous {
                tied: vec![h.get("2.1").unwrap(), h.get("2.2").unwrap()],
                common_ancestor: h.get("2"),
            }
        );
        assert_eq!(res.subtype.as_deref(), Some("2"));
        assert_eq!(res.inconsistent_subtypes, vec!["2.1", "2.2"]);
        assert_eq!(res.n_conflicting_tiles, 2);
    }

    #[test]
    fn test_tie_across_roots_has_no_subtype() {
        let tiles = vec![Tile::positive(1, "1"), Tile::positive(2, "2")];
        let scheme = Scheme::new("roots", tiles).unwrap();
        let matches = make_matches(&scheme, &["1-1", "2-2"]);
        let res = resolve(&scheme, &matches);

        assert!(matches!(res.call, SubtypeCall::Ambiguous { common_ancestor: None, .. }));
        assert!(res.subtype.is_none());
        assert!(res.all_subtypes_matched.is_empty());
    }

    #[test]
    fn test_mixed_target_recorded() {
        let scheme = make_scheme();
        let matches = make_matches(
            &scheme,
            &["negative100-1", "200-2", "negative200-2", "negative300-2.1"],
        );
        let res = resolve(&scheme, &matches);

        assert_eq!(
            res.mixed_targets,
            vec![MixedTarget {
                target_site: 200,
                subtype: "2".to_string(),
                on_called_path: true,
            }]
        );
        assert!(!res.are_subtypes_consistent);
        // the mixed site counts once
        assert_eq!(res.observed.all, 4);
        assert_eq!(res.n_sites_found, 3);
    }

    #[test]
    fn test_skipped_levels_are_reported() {
        let scheme = make_scheme();
        let matches = make_matches(&scheme, &["negative100-1", "200-2", "500-2.1.1.1"]);
        let res = resolve(&scheme, &matches);

        // "2.1.1.1" skips the tiled level "2.1"; "2.1.1" has no tiles
        assert_eq!(res.subtype.as_deref(), Some("2"));
        assert_eq!(res.missing_nested_subtypes, vec!["2.1"]);
    }

    #[test]
    fn test_downstream_sites_without_alleles() {
        let scheme = make_scheme();
        let matches = make_matches(&scheme, &["negative100-1", "200-2"]);
        let res = resolve(&scheme, &matches);

        assert_eq!(res.subtype.as_deref(), Some("2"));
        assert_eq!(res.downstream.n_sites, 3);
        assert_eq!(res.downstream.n_missing_sites, 3);
        assert_eq!(res.downstream.missing_subtypes, vec!["2.1", "2.1.1.1"]);
        assert!((res.downstream.missing_proportion() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let scheme = make_scheme();
        let matches = make_matches(&scheme, &["100-1", "200-2", "300-2.1"]);
        let a = resolve(&scheme, &matches);
        let b = resolve(&scheme, &matches);
        assert_eq!(a.call, b.call);
        assert_eq!(a.inconsistent_subtypes, b.inconsistent_subtypes);
        assert_eq!(a.observed, b.observed);
    }
}
