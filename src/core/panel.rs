use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::region::{GenomicRegion, Locus};
use crate::core::types::SourceKind;
use crate::utils::validation::md5_hex;

/// The input a region was resolved from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionSource {
    pub source_kind: SourceKind,
    pub source_identifier: String,
}

impl RegionSource {
    #[must_use]
    pub fn of(region: &GenomicRegion) -> Self {
        Self {
            source_kind: region.source_kind,
            source_identifier: region.source_identifier.clone(),
        }
    }
}

impl std::fmt::Display for RegionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source_kind, self.source_identifier)
    }
}

/// Regions that share coordinates but carry different ids (legal, flagged for audit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoLocation {
    pub locus: Locus,
    pub region_ids: Vec<String>,
}

/// The same region delivered more than once (same id, same coordinates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRegion {
    pub region_id: String,
    /// Number of times the region was seen across all input streams
    pub occurrences: usize,
    /// Distinct inputs that produced the region, sorted
    pub sources: Vec<RegionSource>,
}

/// Provenance recorded when a panel is consolidated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// RFC 3339 creation timestamp
    pub created_at: String,

    /// Upstream file -> md5 of its bytes
    #[serde(default)]
    pub source_file_hashes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub co_located: Vec<CoLocation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<DuplicateRegion>,
}

impl Provenance {
    #[must_use]
    pub fn now() -> Self {
        Self {
            created_at: chrono::Utc::now().to_rfc3339(),
            source_file_hashes: BTreeMap::new(),
            co_located: Vec::new(),
            duplicates: Vec::new(),
        }
    }
}

/// A consolidated, deduplicated and ordered set of regions destined for one BED file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub regions: Vec<GenomicRegion>,
    pub provenance: Provenance,
}

impl Panel {
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[must_use]
    pub fn get(&self, region_id: &str) -> Option<&GenomicRegion> {
        self.regions.iter().find(|r| r.region_id == region_id)
    }

    /// Digest of the region list only, independent of when the panel was made
    #[must_use]
    pub fn digest(&self) -> String {
        let lines: Vec<String> = self
            .regions
            .iter()
            .map(|r| {
                format!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    r.region_id,
                    r.chromosome,
                    r.start,
                    r.stop,
                    r.strand.map_or(".", |s| s.as_str()),
                    r.source_kind,
                    r.source_identifier
                )
            })
            .collect();
        md5_hex(lines.join("\n").as_bytes())
    }
}
