//! Tile-match-to-subtype engine.
//!
//! One sample flows through the pipeline as:
//!
//! ```text
//! evidence -> match records -> frequency filter + coverage (reads only)
//!          -> resolver -> QC rules -> SubtypeResult
//! ```
//!
//! - [`params`]: thresholds and their per-input-type defaults
//! - [`coverage`]: frequency window filtering and coverage statistics
//! - [`resolver`]: deepest consistent call, conflicts and match counts
//! - [`qc`]: ordered QC checks folded into a single verdict
//! - [`engine`]: single-sample pipeline and the parallel batch runner
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tile_subtyper::parsing::evidence::parse_evidence_file;
//! use tile_subtyper::{Scheme, SubtypingConfig, SubtypingEngine};
//!
//! let scheme = Scheme::load(Path::new("heidelberg.fasta")).unwrap();
//! let samples = parse_evidence_file(Path::new("matches.tsv"), None).unwrap();
//!
//! let engine = SubtypingEngine::new(&scheme, SubtypingConfig::default()).unwrap();
//! for result in engine.subtype_samples(&samples, 4).unwrap() {
//!     println!("{}\t{:?}\t{}", result.sample, result.subtype, result.qc_status);
//! }
//! ```

pub mod coverage;
pub mod engine;
pub mod params;
pub mod qc;
pub mod resolver;
