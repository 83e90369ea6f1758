use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::scheme::hierarchy::{compare_labels, NodeId};
use crate::scheme::store::Scheme;

#[derive(Args)]
pub struct SchemeArgs {
    /// Scheme FASTA of tiles (may be gzipped)
    #[arg(required = true)]
    pub scheme: PathBuf,

    /// Only list subtypes at or above this depth
    #[arg(long)]
    pub max_depth: Option<usize>,
}

struct SubtypeSummary<'a> {
    label: &'a str,
    parent: Option<&'a str>,
    depth: usize,
    n_sites: usize,
    n_positive_tiles: usize,
    n_negative_tiles: usize,
    n_children: usize,
}

fn summarize(scheme: &Scheme, node: NodeId) -> SubtypeSummary<'_> {
    let hierarchy = scheme.hierarchy();
    let sites: Vec<_> = scheme.sites_for_node(node).collect();
    SubtypeSummary {
        label: hierarchy.label(node),
        parent: hierarchy.parent(node).map(|p| hierarchy.label(p)),
        depth: hierarchy.depth(node),
        n_sites: sites.len(),
        n_positive_tiles: sites.iter().filter(|s| s.positive.is_some()).count(),
        n_negative_tiles: sites.iter().filter(|s| s.negative.is_some()).count(),
        n_children: hierarchy.node(node).children.len(),
    }
}

/// Execute scheme subcommand
///
/// # Errors
///
/// Returns an error if the scheme cannot be loaded or is invalid.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SchemeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let scheme = Scheme::load(&args.scheme)?;
    let hierarchy = scheme.hierarchy();

    let mut nodes: Vec<NodeId> = hierarchy
        .iter()
        .map(|(id, _)| id)
        .filter(|&id| args.max_depth.map_or(true, |max| hierarchy.depth(id) <= max))
        .collect();
    nodes.sort_by(|&a, &b| compare_labels(hierarchy.label(a), hierarchy.label(b)));
    let summaries: Vec<SubtypeSummary<'_>> = nodes.iter().map(|&n| summarize(&scheme, n)).collect();

    match format {
        OutputFormat::Text => {
            let label_width = summaries
                .iter()
                .map(|s| s.label.len())
                .max()
                .unwrap_or(7)
                .max(7);

            println!(
                "Scheme '{}' ({} tiles, {} target sites, {} subtypes)\n",
                scheme.name,
                scheme.tiles().len(),
                scheme.n_target_sites(),
                hierarchy.len()
            );
            println!(
                "{:<label_w$} {:>5} {:>6} {:>9} {:>9}",
                "Subtype",
                "Depth",
                "Sites",
                "Positive",
                "Negative",
                label_w = label_width
            );
            println!("{}", "-".repeat(label_width + 34));

            for s in &summaries {
                println!(
                    "{:<label_w$} {:>5} {:>6} {:>9} {:>9}",
                    s.label,
                    s.depth,
                    s.n_sites,
                    s.n_positive_tiles,
                    s.n_negative_tiles,
                    label_w = label_width
                );
                if verbose && s.n_sites == 0 {
                    println!("  └─ no tiles; implied by {} descendant(s)", s.n_children);
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "name": scheme.name,
                "n_tiles": scheme.tiles().len(),
                "n_target_sites": scheme.n_target_sites(),
                "subtypes": summaries
                    .iter()
                    .map(|s| serde_json::json!({
                        "subtype": s.label,
                        "parent": s.parent,
                        "depth": s.depth,
                        "n_target_sites": s.n_sites,
                        "n_positive_tiles": s.n_positive_tiles,
                        "n_negative_tiles": s.n_negative_tiles,
                        "n_children": s.n_children,
                    }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("subtype\tparent\tdepth\tn_target_sites\tn_positive_tiles\tn_negative_tiles\tn_children");
            for s in &summaries {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    s.label,
                    s.parent.unwrap_or(""),
                    s.depth,
                    s.n_sites,
                    s.n_positive_tiles,
                    s.n_negative_tiles,
                    s.n_children
                );
            }
        }
    }

    Ok(())
}
