use serde::{Deserialize, Serialize};

/// QC verdict for a subtyping result.
///
/// Variants are ordered by severity so the most severe of several findings
/// can be picked with `max()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QcStatus {
    Pass,
    Warning,
    Fail,
}

impl std::fmt::Display for QcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warning => write!(f, "WARNING"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Kind of sequence data the tile evidence was collected from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// Assembled contigs: a tile is either present or absent
    Contigs,
    /// Raw sequencing reads: each found tile carries a k-mer frequency
    Reads,
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contigs => write!(f, "contigs"),
            Self::Reads => write!(f, "reads"),
        }
    }
}

/// Whether matching a tile supports or contradicts its subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qc_status_severity_order() {
        assert!(QcStatus::Fail > QcStatus::Warning);
        assert!(QcStatus::Warning > QcStatus::Pass);
        let worst = [QcStatus::Warning, QcStatus::Pass, QcStatus::Fail]
            .into_iter()
            .max();
        assert_eq!(worst, Some(QcStatus::Fail));
    }

    #[test]
    fn test_qc_status_serializes_uppercase() {
        let json = serde_json::to_string(&QcStatus::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
        assert_eq!(QcStatus::Pass.to_string(), "PASS");
    }
}
