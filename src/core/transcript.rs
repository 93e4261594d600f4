use serde::{Deserialize, Serialize};

use crate::core::region::GenomicRegion;
use crate::core::types::{IdentifierNamespace, ManeType, StableId};

/// A transcript resolved from a user request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Identifier exactly as the user supplied it
    pub requested_identifier: String,

    /// Accession the annotation service resolved it to
    pub resolved_identifier: StableId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mane: Option<ManeType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biotype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_name: Option<String>,

    /// Regions contributed by this transcript (its span, or one per exon)
    pub regions: Vec<GenomicRegion>,
}

impl Transcript {
    #[must_use]
    pub fn identifier_namespace(&self) -> IdentifierNamespace {
        self.resolved_identifier.namespace
    }

    #[must_use]
    pub fn is_mane(&self) -> bool {
        self.mane.is_some()
    }
}
