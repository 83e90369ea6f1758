//! Core data types for hierarchical subtyping.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`types::QcStatus`], [`types::InputType`], [`types::Polarity`]: small
//!   classification enums
//! - [`tile::Tile`]: one scheme tile tied to a target site and a subtype label
//! - [`tile::SampleEvidence`]: the tiles found in one sample by the upstream search
//! - [`tile::TileMatch`]: one match record per scheme tile for a sample
//! - [`result::SubtypeResult`]: the frozen per-sample output record
//!
//! ## Subtype Labels
//!
//! Labels are dot-delimited and hierarchical; every prefix is an ancestor:
//!
//! | Label | Depth | Ancestors |
//! |-------|-------|-----------|
//! | `2` | 1 | none |
//! | `2.1` | 2 | `2` |
//! | `2.1.1.2` | 4 | `2`, `2.1`, `2.1.1` |
//!
//! A tile supporting a label implicitly supports all of its ancestors.

pub mod result;
pub mod tile;
pub mod types;
