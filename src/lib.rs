//! # tile-subtyper
//!
//! A library for hierarchical genomic subtyping from tile match evidence.
//!
//! A subtyping scheme is a set of short diagnostic sequences ("tiles"). Each
//! tile belongs to a genomic target site and a dot-delimited subtype label
//! such as `2.2.2.2.1.4`, and is either the positive allele (supports the
//! label) or the negative allele (refutes it). Given which tiles an upstream
//! k-mer search found in a genome, `tile-subtyper` calls the most specific
//! subtype consistent with the evidence and explains how far that call can be
//! trusted.
//!
//! ## Features
//!
//! - **Hierarchical calls**: deepest label whose tiled ancestors are all supported
//! - **Conflict detection**: branching subtypes and sites with both alleles found
//! - **Contig and read input**: frequency window and coverage checks for reads
//! - **QC verdicts**: PASS, WARNING or FAIL with a diagnostic message
//! - **Batch runs**: samples are subtyped independently on a thread pool
//!
//! ## Example
//!
//! ```rust
//! use tile_subtyper::{
//!     InputType, QcStatus, SampleEvidence, Scheme, SubtypingConfig, SubtypingEngine,
//! };
//! use tile_subtyper::core::tile::{Tile, TileHit};
//!
//! let scheme = Scheme::new(
//!     "demo",
//!     vec![
//!         Tile::positive(100, "1"),
//!         Tile::negative(100, "1"),
//!         Tile::positive(200, "1.1"),
//!         Tile::negative(200, "1.1"),
//!     ],
//! )
//! .unwrap();
//!
//! let sample = SampleEvidence::new(
//!     "genome-1",
//!     InputType::Contigs,
//!     vec![TileHit::new("100-1"), TileHit::new("200-1.1")],
//! );
//!
//! let engine = SubtypingEngine::new(&scheme, SubtypingConfig::default()).unwrap();
//! let result = engine.subtype_sample(&sample);
//! assert_eq!(result.subtype.as_deref(), Some("1.1"));
//! assert_eq!(result.qc_status, QcStatus::Pass);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Core data types for tiles, evidence and results
//! - [`scheme`]: Scheme loading, target sites and the subtype hierarchy
//! - [`parsing`]: Parsers for scheme FASTA files and evidence tables
//! - [`subtyping`]: Resolver, coverage analysis, QC rules and the engine
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod parsing;
pub mod scheme;
pub mod subtyping;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::result::SubtypeResult;
pub use core::tile::{SampleEvidence, Tile, TileHit};
pub use core::types::*;
pub use scheme::store::Scheme;
pub use subtyping::engine::{EvidenceError, SubtypingEngine};
pub use subtyping::params::{ParamOverrides, SubtypingConfig, SubtypingParams};
