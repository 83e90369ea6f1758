//! QC Rule Engine.
//!
//! Each check is a pure function of the resolver output, the coverage
//! statistics and the parameters, returning at most one [`Finding`].
//! [`evaluate`] runs the checks in a fixed order and folds their findings into
//! a single [`QcVerdict`]: the most severe status wins and the messages are
//! joined in check order, each prefixed with its status.
//!
//! A sample without a subtype always fails. When no positive tile matched at
//! all the remaining checks are skipped; when divergent branches tied without
//! a common ancestor they still run, so the conflict is reported.

use tracing::info;

use crate::core::types::{InputType, QcStatus};
use crate::subtyping::coverage::CoverageStats;
use crate::subtyping::params::SubtypingParams;
use crate::subtyping::resolver::Resolution;

pub const MISSING_TILES_ERROR: &str = "Missing Tiles Error 1";
pub const MIXED_SAMPLE_ERROR: &str = "Mixed Sample Error 2";
pub const AMBIGUOUS_RESULTS_ERROR: &str = "Ambiguous Results Error 3";
pub const UNCONFIDENT_RESULTS_ERROR: &str = "Unconfident Results Error 4";
pub const INTERMEDIATE_SUBTYPE_WARNING: &str = "Intermediate Subtype Warning";
pub const NO_SUBTYPE_RESULT: &str = "No subtype result!";

/// Separator between findings in a QC message
pub const MESSAGE_SEPARATOR: &str = " | ";

/// One triggered check
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub status: QcStatus,
    pub message: String,
}

impl Finding {
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: QcStatus::Fail,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: QcStatus::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.status == QcStatus::Fail
    }
}

/// Final QC outcome for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct QcVerdict {
    pub status: QcStatus,
    /// Empty on PASS
    pub message: String,
    /// The intermediate subtype check fired
    pub is_intermediate: bool,
}

impl QcVerdict {
    /// Reduce findings to a verdict: max severity, messages in order
    #[must_use]
    pub fn from_findings(findings: &[Finding], is_intermediate: bool) -> Self {
        let status = findings
            .iter()
            .map(|f| f.status)
            .max()
            .unwrap_or(QcStatus::Pass);
        let message = findings
            .iter()
            .map(|f| format!("{}: {}", f.status, f.message))
            .collect::<Vec<_>>()
            .join(MESSAGE_SEPARATOR);

        Self {
            status,
            message,
            is_intermediate,
        }
    }
}

/// Inputs shared by every check
#[derive(Debug, Clone, Copy)]
pub struct QcContext<'a> {
    pub resolution: &'a Resolution,
    /// Present for read input only
    pub coverage: Option<&'a CoverageStats>,
    pub params: &'a SubtypingParams,
    pub input_type: InputType,
}

type Check = fn(&QcContext<'_>) -> Option<Finding>;

/// Checks run after the no-subtype check, in reporting order
const CHECKS: [Check; 5] = [
    check_missing_tiles,
    check_mixed_sample,
    check_ambiguous_results,
    check_unconfident_results,
    check_low_coverage,
];

/// Run every check and fold the findings into a verdict
#[must_use]
pub fn evaluate(ctx: &QcContext<'_>) -> QcVerdict {
    let mut findings: Vec<Finding> = Vec::new();
    if let Some(finding) = check_no_call(ctx) {
        if ctx.resolution.call.is_no_call() {
            return QcVerdict::from_findings(&[finding], false);
        }
        findings.push(finding);
    }

    findings.extend(CHECKS.iter().filter_map(|check| check(ctx)));

    // Only meaningful when nothing has already failed the call
    let mut is_intermediate = false;
    if !findings.iter().any(Finding::is_fail) {
        if let Some(finding) = check_intermediate_subtype(ctx) {
            is_intermediate = true;
            findings.push(finding);
        }
    }

    let verdict = QcVerdict::from_findings(&findings, is_intermediate);
    info!(
        "QC {} for subtype {:?} ({} finding(s))",
        verdict.status,
        ctx.resolution.subtype,
        findings.len()
    );
    verdict
}

#[inline]
fn percent(numerator: usize, denominator: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// No subtype could be reported, either for lack of positive tiles or for a
/// tie between unrelated branches
pub fn check_no_call(ctx: &QcContext<'_>) -> Option<Finding> {
    ctx.resolution
        .subtype
        .is_none()
        .then(|| Finding::fail(NO_SUBTYPE_RESULT))
}

/// Too few target sites yielded any allele
pub fn check_missing_tiles(ctx: &QcContext<'_>) -> Option<Finding> {
    let observed = ctx.resolution.n_sites_found;
    let expected = ctx.resolution.expected.all;
    if expected == 0 || observed >= expected {
        return None;
    }

    let missing_pct = 100.0 - percent(observed, expected);
    let threshold_pct = ctx.params.max_missing_tiles * 100.0;
    if missing_pct <= threshold_pct {
        return None;
    }

    let mut message = format!(
        "{MISSING_TILES_ERROR}: {missing_pct:.2}% missing tiles; more than {threshold_pct:.2}% missing tiles threshold."
    );
    match (ctx.input_type, ctx.coverage) {
        (InputType::Reads, Some(coverage)) => {
            let depth = coverage.avg_tile_coverage;
            let expected_depth = ctx.params.low_coverage_threshold;
            if depth < expected_depth {
                message.push_str(&format!(
                    " Low coverage depth ({depth:.1} < {expected_depth:.1} expected); you may need more WGS data."
                ));
            } else {
                message.push_str(&format!(
                    " Okay coverage depth ({depth:.1} >= {expected_depth:.1} expected), but this may be the wrong serovar or species for scheme."
                ));
            }
            if coverage.n_filtered_tiles > 0 {
                message.push_str(&format!(
                    " {} tile(s) outside the accepted frequency window were not counted.",
                    coverage.n_filtered_tiles
                ));
            }
        }
        _ => message.push_str(
            " Input contigs may be incomplete or this may be the wrong serovar or species for scheme.",
        ),
    }

    Some(Finding::fail(message))
}

/// Both alleles of one or more target sites were found
pub fn check_mixed_sample(ctx: &QcContext<'_>) -> Option<Finding> {
    let mixed = &ctx.resolution.mixed_targets;
    if mixed.is_empty() {
        return None;
    }

    let mut by_subtype: Vec<(&str, Vec<u64>)> = Vec::new();
    for target in mixed {
        match by_subtype.iter_mut().find(|(label, _)| *label == target.subtype) {
            Some((_, sites)) => sites.push(target.target_site),
            None => by_subtype.push((target.subtype.as_str(), vec![target.target_site])),
        }
    }

    // each site is listed once per matched allele, positive tiles first
    let mut sentences: Vec<String> = by_subtype
        .iter()
        .map(|(label, sites)| {
            let occurrences = sites
                .iter()
                .chain(sites.iter())
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Mixed subtype; the positive and negative kmers were found for the same target sites {occurrences} for subtype \"{label}\"."
            )
        })
        .collect();

    let on_path: Vec<String> = mixed
        .iter()
        .filter(|t| t.on_called_path)
        .map(|t| t.target_site.to_string())
        .collect();
    if !on_path.is_empty() {
        if let Some(subtype) = ctx.resolution.subtype.as_deref() {
            sentences.push(format!(
                "{MIXED_SAMPLE_ERROR}: negative kmers contradict the called subtype \"{subtype}\" at target sites {}.",
                on_path.join(", ")
            ));
        }
    }

    Some(Finding::fail(sentences.join(" ")))
}

/// Positive tiles support divergent branches of the hierarchy
pub fn check_ambiguous_results(ctx: &QcContext<'_>) -> Option<Finding> {
    let resolution = ctx.resolution;
    if resolution.inconsistent_subtypes.is_empty() {
        return None;
    }

    let message = format!(
        "{AMBIGUOUS_RESULTS_ERROR}: Mixed subtypes found: \"{}\".",
        resolution.inconsistent_subtypes.join("; ")
    );
    if resolution.n_conflicting_tiles > ctx.params.min_ambiguous_tiles {
        Some(Finding::fail(message))
    } else {
        Some(Finding::warning(message))
    }
}

/// The levels around the call lack the tiles needed to trust it
pub fn check_unconfident_results(ctx: &QcContext<'_>) -> Option<Finding> {
    let resolution = ctx.resolution;
    let mut reasons = Vec::new();

    let downstream = &resolution.downstream;
    if downstream.n_sites > 0 && downstream.missing_proportion() > ctx.params.max_missing_tiles {
        let labels = downstream
            .missing_subtypes
            .iter()
            .map(|l| format!("'{l}'"))
            .collect::<Vec<_>>()
            .join(", ");
        reasons.push(format!(
            "{:.2}% missing kmers for downstream subtype(s) {labels}",
            percent(downstream.n_missing_sites, downstream.n_sites)
        ));
    }

    if !resolution.missing_nested_subtypes.is_empty() {
        reasons.push(format!(
            "missing kmers for nested hierarchical subtype(s) \"{}\"",
            resolution.missing_nested_subtypes.join("; ")
        ));
    }

    if reasons.is_empty() {
        return None;
    }

    let subtype = resolution.subtype.as_deref().unwrap_or_default();
    Some(Finding::fail(format!(
        "{UNCONFIDENT_RESULTS_ERROR}: Subtype \"{subtype}\" is not confident; {}.",
        reasons.join("; ")
    )))
}

/// Average tile frequency is under the failure or warning threshold
pub fn check_low_coverage(ctx: &QcContext<'_>) -> Option<Finding> {
    if ctx.input_type != InputType::Reads {
        return None;
    }
    let avg = ctx.coverage?.avg_tile_coverage;

    let threshold = ctx.params.low_coverage_threshold;
    if avg < threshold {
        return Some(Finding::fail(format!(
            "Low coverage for all kmers ({avg:.3} < {threshold} expected)"
        )));
    }

    let threshold = ctx.params.low_coverage_warning;
    if avg < threshold {
        return Some(Finding::warning(format!(
            "Low coverage for all kmers ({avg:.3} < {threshold} expected)"
        )));
    }

    None
}

/// The called node is under-supported relative to its scheme tiles
pub fn check_intermediate_subtype(ctx: &QcContext<'_>) -> Option<Finding> {
    let resolution = ctx.resolution;
    let subtype = resolution.subtype.as_deref()?;
    let observed = resolution.observed.subtype;
    let expected = resolution.expected.subtype;
    if expected == 0 || observed >= expected {
        return None;
    }

    if percent(expected - observed, expected) / 100.0 <= ctx.params.max_intermediate_tiles {
        return None;
    }

    Some(Finding::warning(format!(
        "{INTERMEDIATE_SUBTYPE_WARNING}: Total subtype matches observed (n={observed}) vs expected (n={expected}); the sample may be an intermediate subtype below \"{subtype}\"."
    )))
}
