//! Ensembl TARK transcript archive.
//!
//! TARK holds every released version of every RefSeq and Ensembl transcript,
//! with locations on both assemblies and MANE annotations.

use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

use super::http::{HttpClient, RetryPolicy};
use crate::core::types::{Assembly, ManeType};
use crate::error::Error;
use crate::resolve::identifiers::split_version;
use crate::resolve::source::{AnnotationSource, ExonCandidate, TranscriptCandidate};

pub const DEFAULT_TARK_URL: &str = "https://tark.ensembl.org/";

#[derive(Debug, Clone, Deserialize)]
struct TarkTranscript {
    stable_id: String,
    #[serde(default)]
    stable_id_version: Option<u32>,
    #[serde(default)]
    assembly: Option<String>,
    #[serde(default)]
    biotype: Option<String>,
    loc_start: u64,
    loc_end: u64,
    #[serde(default)]
    loc_strand: Option<i8>,
    loc_region: String,
    #[serde(default)]
    mane_transcript_type: Option<String>,
    #[serde(default)]
    exons: Vec<TarkExon>,
    #[serde(default)]
    genes: Vec<TarkGene>,
}

#[derive(Debug, Clone, Deserialize)]
struct TarkExon {
    #[serde(default)]
    exon_order: Option<u32>,
    loc_start: u64,
    loc_end: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct TarkGene {
    #[serde(default)]
    name: Option<String>,
}

impl TarkTranscript {
    fn gene_name(&self) -> Option<&str> {
        self.genes.iter().find_map(|g| g.name.as_deref())
    }

    fn versioned_id(&self) -> String {
        match self.stable_id_version {
            Some(v) => format!("{}.{v}", self.stable_id),
            None => self.stable_id.clone(),
        }
    }

    fn into_candidate(self) -> TranscriptCandidate {
        let gene_name = self.gene_name().map(str::to_string);
        let exons = self
            .exons
            .iter()
            .enumerate()
            .map(|(i, e)| ExonCandidate {
                order: e.exon_order.unwrap_or(u32::try_from(i + 1).unwrap_or(u32::MAX)),
                start: e.loc_start,
                stop: e.loc_end,
            })
            .collect();
        TranscriptCandidate {
            stable_id: self.stable_id,
            stable_id_version: self.stable_id_version,
            assembly: self.assembly,
            chromosome: self.loc_region,
            start: self.loc_start,
            stop: self.loc_end,
            strand: self.loc_strand,
            biotype: self.biotype,
            mane: self.mane_transcript_type.as_deref().and_then(ManeType::parse),
            gene_name,
            exons,
        }
    }
}

/// [`AnnotationSource`] backed by the TARK REST API
#[derive(Debug, Clone)]
pub struct TarkClient {
    http: HttpClient,
    assembly: Assembly,
}

impl TarkClient {
    /// # Errors
    ///
    /// As for [`HttpClient::new`].
    pub fn new(base_url: &str, assembly: Assembly, retry: RetryPolicy) -> Result<Self, Error> {
        Ok(Self {
            http: HttpClient::new("tark", base_url, retry)?,
            assembly,
        })
    }

    fn fetch(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<TarkTranscript>, Error> {
        let url = self.http.url(path, params)?;
        self.http.get_pages(&url)
    }
}

impl AnnotationSource for TarkClient {
    fn resolve_transcript(&self, identifier: &str) -> Result<Vec<TranscriptCandidate>, Error> {
        let (accession, version) =
            split_version(identifier.trim()).map_err(|reason| Error::unresolved(identifier, reason))?;
        let assembly = self.assembly.to_string();
        let version = version.map(|v| v.to_string());

        let mut params = vec![
            ("stable_id", accession),
            ("assembly_name", assembly.as_str()),
            ("expand", "exons,genes"),
        ];
        if let Some(v) = &version {
            params.push(("stable_id_version", v.as_str()));
        }

        let candidates: Vec<_> = self
            .fetch("api/transcript/", &params)?
            .into_iter()
            .map(TarkTranscript::into_candidate)
            .collect();
        debug!("TARK returned {} record(s) for {identifier}", candidates.len());
        Ok(candidates)
    }

    fn resolve_gene(&self, gene: &str) -> Result<Vec<String>, Error> {
        let assembly = self.assembly.to_string();
        let records = self.fetch(
            "api/transcript/search/",
            &[
                ("identifier_field", gene.trim()),
                ("assembly_name", assembly.as_str()),
                ("expand", "genes"),
            ],
        )?;
        Ok(transcripts_of_gene(&records, gene))
    }
}

/// Versioned accessions of the records annotated with `gene`, sorted and deduplicated
fn transcripts_of_gene(records: &[TarkTranscript], gene: &str) -> Vec<String> {
    let gene = gene.trim();
    records
        .iter()
        .filter(|r| r.gene_name().is_some_and(|name| name.eq_ignore_ascii_case(gene)))
        .map(TarkTranscript::versioned_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "stable_id": "NM_007294",
        "stable_id_version": 4,
        "assembly": "GRCh38",
        "biotype": "protein_coding",
        "loc_start": 43044295,
        "loc_end": 43125483,
        "loc_strand": -1,
        "loc_region": "17",
        "mane_transcript_type": "MANE Select",
        "exons": [
            {"exon_order": 1, "loc_start": 43124017, "loc_end": 43125483},
            {"exon_order": 2, "loc_start": 43115726, "loc_end": 43115779}
        ],
        "genes": [{"name": "BRCA1", "stable_id": "ENSG00000012048"}],
        "transcript_checksum": "ignored"
    }"#;

    #[test]
    fn test_record_to_candidate() {
        let record: TarkTranscript = serde_json::from_str(RECORD).unwrap();
        let candidate = record.into_candidate();
        assert_eq!(candidate.stable_id, "NM_007294");
        assert_eq!(candidate.stable_id_version, Some(4));
        assert_eq!(candidate.chromosome, "17");
        assert_eq!(candidate.strand, Some(-1));
        assert_eq!(candidate.mane, Some(ManeType::Select));
        assert_eq!(candidate.gene_name.as_deref(), Some("BRCA1"));
        assert_eq!(candidate.exons.len(), 2);
        assert_eq!(candidate.exons[1].order, 2);
    }

    #[test]
    fn test_missing_exon_order_uses_position() {
        let record: TarkTranscript = serde_json::from_str(
            r#"{"stable_id": "ENST1", "loc_start": 1, "loc_end": 50, "loc_region": "1",
                "exons": [{"loc_start": 1, "loc_end": 10}, {"loc_start": 40, "loc_end": 50}]}"#,
        )
        .unwrap();
        let candidate = record.into_candidate();
        assert_eq!(candidate.mane, None);
        let orders: Vec<u32> = candidate.exons.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn test_transcripts_of_gene() {
        let mut nbr2: TarkTranscript = serde_json::from_str(RECORD).unwrap();
        nbr2.stable_id = "NR_003083".to_string();
        nbr2.stable_id_version = Some(3);
        nbr2.genes = vec![TarkGene {
            name: Some("NBR2".to_string()),
        }];
        let brca1: TarkTranscript = serde_json::from_str(RECORD).unwrap();

        let records = vec![brca1.clone(), nbr2, brca1];
        assert_eq!(transcripts_of_gene(&records, "brca1"), vec!["NM_007294.4"]);
        assert!(transcripts_of_gene(&records, "TP53").is_empty());
    }
}
