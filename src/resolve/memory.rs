//! In-memory collaborator for tests and offline runs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::resolve::identifiers::split_version;
use crate::resolve::source::{
    AnnotationSource, PanelSource, ReferenceRegion, TranscriptCandidate, VariantLocation,
    VariantSource,
};

/// Serializable fixture describing everything the in-memory source knows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub transcripts: Vec<TranscriptCandidate>,

    /// Gene symbol or identifier -> transcript accessions
    #[serde(default)]
    pub genes: HashMap<String, Vec<String>>,

    /// rsID -> mapped locations
    #[serde(default)]
    pub variants: HashMap<String, Vec<VariantLocation>>,

    /// Panel id -> reference regions
    #[serde(default)]
    pub panels: HashMap<String, Vec<ReferenceRegion>>,
}

/// Annotation, variant and panel source backed by plain maps.
///
/// Transcript lookups behave like the transcript archive: an unversioned
/// query returns every version of the accession, a versioned query only the
/// matching version.
#[derive(Debug, Default)]
pub struct InMemorySource {
    transcripts: HashMap<String, Vec<TranscriptCandidate>>,
    genes: HashMap<String, Vec<String>>,
    variants: HashMap<String, Vec<VariantLocation>>,
    panels: HashMap<String, Vec<ReferenceRegion>>,
    calls: AtomicUsize,
}

impl InMemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut source = Self::new();
        for candidate in fixture.transcripts {
            source.add_transcript(candidate);
        }
        for (gene, ids) in fixture.genes {
            source.add_gene(gene, ids);
        }
        for (rsid, locations) in fixture.variants {
            source.variants.insert(rsid.to_lowercase(), locations);
        }
        source.panels = fixture.panels;
        source
    }

    /// Load a fixture from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read or `Error::Json` if it is not a fixture.
    pub fn from_json(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn add_transcript(&mut self, candidate: TranscriptCandidate) {
        let accession = accession_of(&candidate.stable_id).to_string();
        self.transcripts.entry(accession).or_default().push(candidate);
    }

    pub fn add_gene(&mut self, gene: impl Into<String>, transcript_ids: Vec<String>) {
        self.genes.insert(gene.into().to_uppercase(), transcript_ids);
    }

    pub fn add_variant(&mut self, rsid: &str, location: VariantLocation) {
        self.variants
            .entry(rsid.to_lowercase())
            .or_default()
            .push(location);
    }

    pub fn add_panel(&mut self, panel_id: impl Into<String>, regions: Vec<ReferenceRegion>) {
        self.panels.insert(panel_id.into(), regions);
    }

    /// Number of lookups served so far, across all operations
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn accession_of(stable_id: &str) -> &str {
    stable_id.split('.').next().unwrap_or(stable_id)
}

impl AnnotationSource for InMemorySource {
    fn resolve_transcript(&self, identifier: &str) -> Result<Vec<TranscriptCandidate>, Error> {
        self.record_call();
        let (accession, version) = split_version(identifier.trim())
            .map_err(|reason| Error::unresolved(identifier, reason))?;

        let candidates = self
            .transcripts
            .get(accession)
            .map(|all| {
                all.iter()
                    .filter(|c| version.is_none() || c.stable_id_version == version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(candidates)
    }

    fn resolve_gene(&self, gene: &str) -> Result<Vec<String>, Error> {
        self.record_call();
        Ok(self
            .genes
            .get(&gene.trim().to_uppercase())
            .cloned()
            .unwrap_or_default())
    }
}

impl VariantSource for InMemorySource {
    fn resolve_variant(&self, rsid: &str) -> Result<Vec<VariantLocation>, Error> {
        self.record_call();
        Ok(self
            .variants
            .get(&rsid.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

impl PanelSource for InMemorySource {
    fn get_panel(&self, panel_id: &str) -> Result<Vec<ReferenceRegion>, Error> {
        self.record_call();
        self.panels
            .get(panel_id)
            .cloned()
            .ok_or_else(|| Error::ExternalService {
                service: "panel".to_string(),
                message: format!("panel '{panel_id}' not found"),
            })
    }
}
