//! Centralized validation and helper functions.

/// Maximum number of tiles allowed in a single scheme (DOS protection)
pub const MAX_TILES: usize = 100_000;

/// Maximum number of evidence rows allowed in a single table
pub const MAX_EVIDENCE_ROWS: usize = 10_000_000;

/// Check if adding another tile would exceed the limit.
///
/// Returns `Some(error_message)` if the count is at or above the limit,
/// `None` otherwise.
#[must_use]
pub fn check_tile_limit(count: usize) -> Option<String> {
    if count >= MAX_TILES {
        Some(format!(
            "Too many tiles: adding another would exceed maximum of {MAX_TILES}"
        ))
    } else {
        None
    }
}

/// Check if adding another evidence row would exceed the limit.
#[must_use]
pub fn check_evidence_limit(count: usize) -> Option<String> {
    if count >= MAX_EVIDENCE_ROWS {
        Some(format!(
            "Too many evidence rows: adding another would exceed maximum of {MAX_EVIDENCE_ROWS}"
        ))
    } else {
        None
    }
}

/// Validate a dot-delimited subtype label such as `2.1.1.2`.
///
/// Every segment must be non-empty and consist of ASCII alphanumerics,
/// `_` or `-`.
///
/// # Examples
///
/// ```
/// use tile_subtyper::utils::validation::is_valid_subtype_label;
///
/// assert!(is_valid_subtype_label("2.2.2.2.1.4"));
/// assert!(!is_valid_subtype_label("2..1"));
/// assert!(!is_valid_subtype_label(""));
/// ```
#[must_use]
pub fn is_valid_subtype_label(label: &str) -> bool {
    !label.is_empty()
        && label.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Is `value` a proportion in `[0.0, 1.0]`?
#[must_use]
pub fn is_proportion(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Is `value` a finite, non-negative number?
#[must_use]
pub fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
