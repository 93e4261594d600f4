//! Ensembl REST variation endpoint, used for dbSNP identifiers.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::http::{HttpClient, RetryPolicy};
use crate::core::types::Assembly;
use crate::error::Error;
use crate::resolve::source::{VariantLocation, VariantSource};

pub const DEFAULT_ENSEMBL_URL: &str = "https://rest.ensembl.org/";
/// Ensembl keeps GRCh37 on a separate server
pub const DEFAULT_ENSEMBL_GRCH37_URL: &str = "https://grch37.rest.ensembl.org/";

/// Default server for an assembly
#[must_use]
pub fn default_url(assembly: Assembly) -> &'static str {
    match assembly {
        Assembly::Grch37 => DEFAULT_ENSEMBL_GRCH37_URL,
        Assembly::Grch38 => DEFAULT_ENSEMBL_URL,
    }
}

#[derive(Debug, Deserialize)]
struct Variation {
    #[serde(default)]
    mappings: Vec<Mapping>,
}

#[derive(Debug, Deserialize)]
struct Mapping {
    seq_region_name: String,
    start: u64,
    end: u64,
    #[serde(default)]
    strand: Option<i8>,
    #[serde(default)]
    assembly_name: Option<String>,
}

impl From<Mapping> for VariantLocation {
    fn from(m: Mapping) -> Self {
        Self {
            chromosome: m.seq_region_name,
            start: m.start,
            stop: m.end,
            assembly: m.assembly_name,
            strand: m.strand,
        }
    }
}

/// [`VariantSource`] backed by the Ensembl REST API
#[derive(Debug, Clone)]
pub struct EnsemblClient {
    http: HttpClient,
}

impl EnsemblClient {
    /// # Errors
    ///
    /// As for [`HttpClient::new`].
    pub fn new(base_url: &str, retry: RetryPolicy) -> Result<Self, Error> {
        // Unknown rsIDs are answered with 400 rather than 404
        let http = HttpClient::new("ensembl", base_url, retry)?
            .with_not_found(&[StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND]);
        Ok(Self { http })
    }
}

impl VariantSource for EnsemblClient {
    fn resolve_variant(&self, rsid: &str) -> Result<Vec<VariantLocation>, Error> {
        let rsid = rsid.trim();
        let url = self.http.url(&format!("variation/human/{rsid}"), &[])?;
        let Some(variation) = self.http.get_json::<Variation>(&url)? else {
            debug!("Ensembl has no record of {rsid}");
            return Ok(Vec::new());
        };
        Ok(variation.mappings.into_iter().map(VariantLocation::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variation() {
        let json = r#"{
            "name": "rs28934578",
            "var_class": "SNP",
            "mappings": [
                {"seq_region_name": "17", "start": 7675088, "end": 7675088, "strand": 1,
                 "assembly_name": "GRCh38", "allele_string": "C/A/G/T", "location": "17:7675088-7675088"},
                {"seq_region_name": "CHR_HSCHR17_1_CTG1", "start": 7675100, "end": 7675100, "strand": 1,
                 "assembly_name": "GRCh38"}
            ]
        }"#;
        let variation: Variation = serde_json::from_str(json).unwrap();
        let locations: Vec<VariantLocation> = variation.mappings.into_iter().map(VariantLocation::from).collect();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].chromosome, "17");
        assert_eq!((locations[0].start, locations[0].stop), (7_675_088, 7_675_088));
        assert_eq!(locations[0].assembly.as_deref(), Some("GRCh38"));
    }

    #[test]
    fn test_default_url_per_assembly() {
        assert!(default_url(Assembly::Grch37).contains("grch37"));
        assert_eq!(default_url(Assembly::Grch38), DEFAULT_ENSEMBL_URL);
    }
}
