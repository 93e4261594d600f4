//! Genomics England PanelApp, the source of curated reference panels.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::http::{HttpClient, RetryPolicy};
use crate::core::types::Assembly;
use crate::error::Error;
use crate::resolve::source::{PanelSource, ReferenceRegion};

pub const DEFAULT_PANELAPP_URL: &str = "https://panelapp.genomicsengland.co.uk/";

#[derive(Debug, Deserialize)]
struct PanelGene {
    gene_data: GeneData,
}

#[derive(Debug, Deserialize)]
struct GeneData {
    gene_symbol: String,
    /// assembly label -> Ensembl release -> gene record
    #[serde(default)]
    ensembl_genes: BTreeMap<String, BTreeMap<String, EnsemblGene>>,
}

#[derive(Debug, Deserialize)]
struct EnsemblGene {
    #[serde(default)]
    location: Option<String>,
}

/// Parse a PanelApp location such as `17:43044295-43125483` (1-based closed)
#[must_use]
pub fn parse_location(location: &str) -> Option<(String, u64, u64)> {
    let (chromosome, range) = location.trim().split_once(':')?;
    let (start, stop) = range.split_once('-')?;
    let start = start.trim().replace(',', "").parse().ok()?;
    let stop = stop.trim().replace(',', "").parse().ok()?;
    (!chromosome.is_empty() && start >= 1 && start <= stop).then(|| (chromosome.to_string(), start, stop))
}

impl GeneData {
    /// Location on `assembly` from the most recent Ensembl release that has one
    fn location(&self, assembly: Assembly) -> Option<(String, u64, u64)> {
        let releases = self
            .ensembl_genes
            .iter()
            .find(|(label, _)| assembly.matches_label(label))
            .map(|(_, releases)| releases)?;

        let mut by_release: Vec<(u32, &EnsemblGene)> = releases
            .iter()
            .map(|(release, gene)| (release.parse().unwrap_or(0), gene))
            .collect();
        by_release.sort_by(|a, b| b.0.cmp(&a.0));
        by_release
            .into_iter()
            .find_map(|(_, gene)| gene.location.as_deref().and_then(parse_location))
    }
}

fn reference_regions(genes: Vec<PanelGene>, assembly: Assembly) -> Vec<ReferenceRegion> {
    let mut regions = Vec::with_capacity(genes.len());
    for gene in genes {
        let data = gene.gene_data;
        match data.location(assembly) {
            Some((chromosome, start, stop)) => regions.push(ReferenceRegion {
                identifier: data.gene_symbol,
                chromosome,
                start,
                stop,
            }),
            None => debug!("PanelApp gene {} has no {assembly} location", data.gene_symbol),
        }
    }
    regions
}

/// [`PanelSource`] backed by the PanelApp REST API
#[derive(Debug, Clone)]
pub struct PanelAppClient {
    http: HttpClient,
    assembly: Assembly,
}

impl PanelAppClient {
    /// # Errors
    ///
    /// As for [`HttpClient::new`].
    pub fn new(base_url: &str, assembly: Assembly, retry: RetryPolicy) -> Result<Self, Error> {
        Ok(Self {
            http: HttpClient::new("panelapp", base_url, retry)?,
            assembly,
        })
    }
}

impl PanelSource for PanelAppClient {
    fn get_panel(&self, panel_id: &str) -> Result<Vec<ReferenceRegion>, Error> {
        let panel_id = panel_id.trim();
        if panel_id.is_empty() || !panel_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!("invalid PanelApp panel id '{panel_id}'")));
        }
        let url = self.http.url(&format!("api/v1/panels/{panel_id}/genes/"), &[])?;
        let genes: Vec<PanelGene> = self.http.get_pages(&url)?;
        let total = genes.len();
        let regions = reference_regions(genes, self.assembly);
        info!(
            "PanelApp panel {panel_id}: {} of {total} gene(s) located on {}",
            regions.len(),
            self.assembly
        );
        Ok(regions)
    }
}
