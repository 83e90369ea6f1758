use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{open_output, OutputFormat};
use crate::core::result::{tsv_header, tsv_record, SubtypeResult};
use crate::core::types::{InputType, QcStatus};
use crate::parsing::evidence::parse_evidence_file;
use crate::scheme::store::Scheme;
use crate::subtyping::engine::SubtypingEngine;
use crate::subtyping::params::{ParamOverrides, SubtypingConfig};

#[derive(Args)]
pub struct SubtypeArgs {
    /// Evidence table(s): tab-separated `sample`, `tile_id` and optional `freq`
    /// columns, one row per tile found
    #[arg(required = true, num_args = 1..)]
    pub evidence: Vec<PathBuf>,

    /// Scheme FASTA of tiles (may be gzipped)
    #[arg(short, long, required = true)]
    pub scheme: PathBuf,

    /// Scheme name to report (defaults to the scheme file name)
    #[arg(long)]
    pub scheme_name: Option<String>,

    /// Scheme version to report
    #[arg(long)]
    pub scheme_version: Option<String>,

    /// Input type of every sample (inferred per sample by default: evidence
    /// with frequencies is read input)
    #[arg(short, long, value_enum)]
    pub input_type: Option<InputType>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of worker threads (0 uses all cores)
    #[arg(short, long, default_value = "1")]
    pub threads: usize,

    // === QC threshold overrides (defaults depend on the input type) ===
    /// Tiles found fewer times than this are treated as not found (reads; default 8)
    #[arg(long)]
    pub min_kmer_freq: Option<u64>,

    /// Tiles found more times than this are treated as not found (reads; default 1000)
    #[arg(long)]
    pub max_kmer_freq: Option<u64>,

    /// Average tile frequency below this fails QC (reads; default 20)
    #[arg(long)]
    pub low_coverage_threshold: Option<f64>,

    /// Maximum proportion of target sites without any tile found (default 0.05)
    #[arg(long)]
    pub max_missing_tiles: Option<f64>,

    /// Conflicting tiles needed before a branching conflict fails QC
    /// (reads default 3, contigs default 0)
    #[arg(long)]
    pub min_ambiguous_tiles: Option<usize>,

    /// Average tile frequency below this is a QC warning (reads; default 20)
    #[arg(long)]
    pub low_coverage_warning: Option<f64>,

    /// Proportion of subtype tiles that may be missing before the call is
    /// flagged as intermediate (default 0.05)
    #[arg(long)]
    pub max_intermediate_tiles: Option<f64>,
}

impl SubtypeArgs {
    fn overrides(&self) -> ParamOverrides {
        ParamOverrides {
            min_kmer_freq: self.min_kmer_freq,
            max_kmer_freq: self.max_kmer_freq,
            low_coverage_threshold: self.low_coverage_threshold,
            max_missing_tiles: self.max_missing_tiles,
            min_ambiguous_tiles: self.min_ambiguous_tiles,
            low_coverage_warning: self.low_coverage_warning,
            max_intermediate_tiles: self.max_intermediate_tiles,
        }
    }
}

/// Execute subtype subcommand
///
/// # Errors
///
/// Returns an error if the parameters are invalid, the scheme or evidence
/// cannot be loaded, or the report cannot be written. Problems with a single
/// sample's evidence are reported as a FAIL result instead.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SubtypeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    // Reject bad thresholds before doing any work
    let config = SubtypingConfig::from_overrides(&args.overrides())?;

    let mut scheme = Scheme::load(&args.scheme)?;
    if let Some(name) = &args.scheme_name {
        scheme.name.clone_from(name);
    }
    if let Some(version) = &args.scheme_version {
        scheme = scheme.with_version(version);
    }

    if verbose {
        eprintln!(
            "Loaded scheme '{}' with {} tiles over {} target sites",
            scheme.name,
            scheme.tiles().len(),
            scheme.n_target_sites()
        );
    }

    let mut samples = Vec::new();
    for path in &args.evidence {
        samples.extend(parse_evidence_file(path, args.input_type)?);
    }
    if samples.is_empty() {
        anyhow::bail!("No samples found in the evidence table(s)");
    }

    if verbose {
        eprintln!(
            "Subtyping {} sample(s) from {} evidence table(s)",
            samples.len(),
            args.evidence.len()
        );
    }

    let engine = SubtypingEngine::new(&scheme, config)?;
    let results = engine.subtype_samples(&samples, args.threads)?;

    let mut out = open_output(args.output.as_deref())?;
    match format {
        OutputFormat::Text => write_text_results(&mut out, &results, verbose)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &results)?;
            writeln!(out)?;
        }
        OutputFormat::Tsv => write_tsv_results(&mut out, &results)?,
    }
    out.flush()?;

    Ok(())
}

fn write_text_results(
    out: &mut dyn Write,
    results: &[SubtypeResult],
    verbose: bool,
) -> anyhow::Result<()> {
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            writeln!(out, "\n{}", "─".repeat(60))?;
        }

        writeln!(
            out,
            "\n{} {} ({})",
            result.sample,
            result.subtype.as_deref().unwrap_or("-"),
            result.qc_status
        )?;
        match &result.scheme_version {
            Some(version) => writeln!(out, "   Scheme: {} v{version}", result.scheme)?,
            None => writeln!(out, "   Scheme: {}", result.scheme)?,
        }
        writeln!(out, "   Input: {}", result.input_type)?;
        if !result.all_subtypes_matched.is_empty() {
            writeln!(out, "   Path: {}", result.all_subtypes_matched.join(" > "))?;
        }
        if !result.are_subtypes_consistent && !result.inconsistent_subtypes.is_empty() {
            writeln!(
                out,
                "   Inconsistent subtypes: {}",
                result.inconsistent_subtypes.join("; ")
            )?;
        }

        writeln!(
            out,
            "\n   Tiles: {}/{} all, {}/{} positive, {}/{} subtype",
            result.n_tiles_matching_all,
            result.n_tiles_matching_all_expected,
            result.n_tiles_matching_positive,
            result.n_tiles_matching_positive_expected,
            result.n_tiles_matching_subtype,
            result.n_tiles_matching_subtype_expected,
        )?;
        if let Some(coverage) = result.avg_tile_coverage {
            writeln!(out, "   Average tile coverage: {coverage:.3}")?;
        }
        if verbose && !result.tiles_matching_subtype.is_empty() {
            writeln!(
                out,
                "   Subtype tiles: {}",
                result.tiles_matching_subtype.join(", ")
            )?;
        }
        if result.is_intermediate_subtype {
            writeln!(out, "   Possible intermediate subtype")?;
        }

        if !result.qc_message.is_empty() {
            writeln!(out, "\n   QC:")?;
            for finding in result.qc_message.split(crate::subtyping::qc::MESSAGE_SEPARATOR) {
                writeln!(out, "   - {finding}")?;
            }
        }
    }

    let count = |status: QcStatus| results.iter().filter(|r| r.qc_status == status).count();
    writeln!(
        out,
        "\n{} sample(s): {} PASS, {} WARNING, {} FAIL",
        results.len(),
        count(QcStatus::Pass),
        count(QcStatus::Warning),
        count(QcStatus::Fail)
    )?;

    Ok(())
}

fn write_tsv_results(out: &mut dyn Write, results: &[SubtypeResult]) -> anyhow::Result<()> {
    // Coverage is only meaningful when some sample is read input
    let include_coverage = results.iter().any(|r| r.input_type == InputType::Reads);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(out);
    writer.write_record(tsv_header(include_coverage))?;
    for result in results {
        writer.write_record(tsv_record(result, include_coverage))?;
    }
    writer.flush()?;

    Ok(())
}
