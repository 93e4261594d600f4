//! # bedmaker
//!
//! A library for building BED files that can be traced back to, and checked
//! against, the inputs they came from.
//!
//! A clinical panel is usually specified as a mix of transcript accessions,
//! gene symbols, dbSNP identifiers and hand-written coordinates. Each of
//! those has its own conventions: versioned or unversioned accessions, MANE
//! selections, 1-based or 0-based positions, `chr17` or `17`. `bedmaker`
//! resolves all of them into one canonical model and writes BED from that
//! model only, so the output can be re-derived and compared at any time.
//!
//! ## Pipeline
//!
//! 1. **Resolve** ([`resolve`]): transcripts, genes, SNPs and coordinates
//!    become [`GenomicRegion`]s in 1-based closed coordinates
//! 2. **Consolidate** ([`panels`]): streams merge into one ordered [`Panel`];
//!    conflicting definitions of a region are rejected
//! 3. **Write** ([`bedfiles`]): a [`FormattingPolicy`] renders the panel as
//!    BED, recording the policy in a header line
//! 4. **Validate** ([`validate`]): the file is parsed back and compared with
//!    freshly resolved inputs
//!
//! ## Example
//!
//! ```rust
//! use bedmaker::bedfiles::{reader::parse_bed, writer::write};
//! use bedmaker::panels::consolidate;
//! use bedmaker::resolve::coordinates::{resolve_coordinates, CoordinateInput};
//! use bedmaker::resolve::RegionStream;
//! use bedmaker::{FormattingPolicy, SourceKind, Validator};
//!
//! let inputs = vec![CoordinateInput::new("chr17", 7_565_097, 7_565_097, Some("TP53_hotspot"))];
//! let regions = resolve_coordinates(&inputs).unwrap();
//! let panel = consolidate(vec![RegionStream { source_kind: SourceKind::Coordinate, regions }]).unwrap();
//!
//! let policy = FormattingPolicy::default();
//! let bed = write(&panel, &policy).unwrap();
//! assert!(bed.render().contains("chr17\t7565096\t7565097\tTP53_hotspot"));
//!
//! let report = Validator::new(&policy)
//!     .validate_panel(&parse_bed(&bed.render()).unwrap(), &panel)
//!     .unwrap();
//! assert!(report.passed);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: regions, panels, transcripts and chromosome naming
//! - [`resolve`]: input resolvers and the collaborator traits they use
//! - [`panels`]: region consolidation
//! - [`bedfiles`]: formatting policy, BED writer and reader
//! - [`validate`]: round-trip validation
//! - [`pipe`]: JSON Lines format passed between subcommands
//! - [`cache`]: response cache and audit log
//! - [`clients`]: HTTP collaborators
//! - [`cli`]: command-line interface implementation

pub mod bedfiles;
pub mod cache;
pub mod cli;
pub mod clients;
pub mod core;
pub mod error;
pub mod panels;
pub mod pipe;
pub mod resolve;
pub mod utils;
pub mod validate;

// Re-export commonly used types for convenience
pub use bedfiles::{BedFile, BedRecord, FormattingPolicy};
pub use core::panel::Panel;
pub use core::region::{GenomicRegion, Locus};
pub use core::transcript::Transcript;
pub use core::types::*;
pub use error::{Error, ErrorCategory};
pub use panels::Consolidator;
pub use validate::{ValidationReport, Validator};
