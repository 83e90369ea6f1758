//! Subtyping scheme: tiles, target sites and the subtype hierarchy.
//!
//! A scheme is a set of tiles, each tied to a target site and a subtype label.
//! Loading a scheme builds, once:
//!
//! - an explicit subtype forest ([`hierarchy::Hierarchy`]) with stable node
//!   indices and resolved parents
//! - the target sites of each subtype and the positive/negative tile of each
//!   site
//! - the per-subtype site counts used as "expected" tile counts
//!
//! The scheme is never mutated after loading, so it can be shared across
//! worker threads without synchronisation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tile_subtyper::Scheme;
//! use std::path::Path;
//!
//! let scheme = Scheme::load(Path::new("heidelberg.fasta")).unwrap();
//! let node = scheme.hierarchy().get("2.2.2.2.1.4").unwrap();
//! println!("{:?}", scheme.expected_counts(Some(node)));
//! ```

pub mod hierarchy;
pub mod store;
