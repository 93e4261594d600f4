//! Interfaces of the external collaborators the resolvers consult.
//!
//! The resolvers never talk to the network themselves: they are handed an
//! implementation of these traits. Production code passes the HTTP clients in
//! [`crate::clients`] (usually wrapped in [`crate::cache::CachedSource`]),
//! tests pass [`crate::resolve::memory::InMemorySource`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::types::ManeType;
use crate::error::Error;

/// One exon of a candidate transcript, 1-based closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExonCandidate {
    /// 1-based exon number in transcript order
    pub order: u32,
    pub start: u64,
    pub stop: u64,
}

/// A transcript record as returned by the annotation service.
///
/// `stable_id` is namespace-ambiguous: the service answers RefSeq and Ensembl
/// queries through the same field, so the resolver has to tag it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptCandidate {
    pub stable_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_id_version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,

    /// Chromosome as named by the service (e.g. `17`)
    pub chromosome: String,

    /// 1-based inclusive
    pub start: u64,

    /// 1-based inclusive
    pub stop: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<i8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biotype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mane: Option<ManeType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exons: Vec<ExonCandidate>,
}

impl TranscriptCandidate {
    /// Protein-coding transcripts are the only ones MANE can cover
    #[must_use]
    pub fn is_protein_coding(&self) -> bool {
        self.biotype
            .as_deref()
            .map_or(true, |b| b.eq_ignore_ascii_case("protein_coding"))
    }
}

/// A genomic location of a dbSNP variant, 1-based closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantLocation {
    pub chromosome: String,
    pub start: u64,
    pub stop: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<i8>,
}

/// A region from an external curated panel, 1-based closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRegion {
    /// Gene symbol or region name used by the panel
    pub identifier: String,
    pub chromosome: String,
    pub start: u64,
    pub stop: u64,
}

/// Transcript annotation service (transcript archive)
pub trait AnnotationSource: Send + Sync {
    /// All candidate records for a transcript accession (versioned or not)
    ///
    /// # Errors
    ///
    /// Returns `Error::ExternalService` when the service cannot answer.
    fn resolve_transcript(&self, identifier: &str) -> Result<Vec<TranscriptCandidate>, Error>;

    /// Transcript accessions belonging to a gene symbol or gene identifier
    ///
    /// # Errors
    ///
    /// Returns `Error::ExternalService` when the service cannot answer.
    fn resolve_gene(&self, gene: &str) -> Result<Vec<String>, Error>;
}

/// dbSNP lookup service
pub trait VariantSource: Send + Sync {
    /// Every mapped location of a RefSNP identifier
    ///
    /// # Errors
    ///
    /// Returns `Error::ExternalService` when the service cannot answer.
    fn resolve_variant(&self, rsid: &str) -> Result<Vec<VariantLocation>, Error>;
}

/// Curated reference panel service
pub trait PanelSource: Send + Sync {
    /// Regions of a reference panel
    ///
    /// # Errors
    ///
    /// Returns `Error::ExternalService` when the service cannot answer.
    fn get_panel(&self, panel_id: &str) -> Result<Vec<ReferenceRegion>, Error>;
}

impl<T: AnnotationSource + ?Sized> AnnotationSource for Arc<T> {
    fn resolve_transcript(&self, identifier: &str) -> Result<Vec<TranscriptCandidate>, Error> {
        (**self).resolve_transcript(identifier)
    }

    fn resolve_gene(&self, gene: &str) -> Result<Vec<String>, Error> {
        (**self).resolve_gene(gene)
    }
}

impl<T: VariantSource + ?Sized> VariantSource for Arc<T> {
    fn resolve_variant(&self, rsid: &str) -> Result<Vec<VariantLocation>, Error> {
        (**self).resolve_variant(rsid)
    }
}

impl<T: PanelSource + ?Sized> PanelSource for Arc<T> {
    fn get_panel(&self, panel_id: &str) -> Result<Vec<ReferenceRegion>, Error> {
        (**self).get_panel(panel_id)
    }
}
