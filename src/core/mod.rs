//! Core data types for region consolidation.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`GenomicRegion`]: one region of interest in canonical coordinates
//! - [`Panel`]: the consolidated, ordered region set behind one BED file
//! - [`Transcript`]: a resolved transcript and the regions it contributed
//! - [`StableId`], [`IdentifierNamespace`], [`ManeType`], [`SourceKind`]: identifier metadata
//!
//! ## Coordinates
//!
//! Every region is held **1-based, closed** (`start <= stop`). BED files are
//! 0-based half-open on disk; the conversion happens only in [`region::to_half_open`]
//! and [`region::from_half_open`].
//!
//! ## Chromosome Naming
//!
//! | Input | Canonical |
//! |-------|-----------|
//! | `17`, `chr17`, `NC_000017.11` | `chr17` |
//! | `MT`, `M`, `chrM`, `NC_012920.1` | `chrM` |
//!
//! Panels are ordered karyotypically: chr1..chr22, chrX, chrY, chrM.
//!
//! [`GenomicRegion`]: region::GenomicRegion
//! [`Panel`]: panel::Panel
//! [`Transcript`]: transcript::Transcript
//! [`StableId`]: types::StableId
//! [`IdentifierNamespace`]: types::IdentifierNamespace
//! [`ManeType`]: types::ManeType
//! [`SourceKind`]: types::SourceKind

pub mod chromosome;
pub mod panel;
pub mod region;
pub mod transcript;
pub mod types;
