//! BED interval files: formatting policy, record model, writer and reader.
//!
//! Regions are 1-based closed in memory and 0-based half-open on disk. The
//! conversion happens in [`writer`] on the way out and in the validator on
//! the way back, never anywhere else.
//!
//! ## Layout
//!
//! ```text
//! #bedmaker   policy=default   policy_digest=<md5>   point_padding=0
//! chr17       7565096          7565097               TP53_hotspot
//! ```
//!
//! BED6 adds score and strand; BED8 adds thickStart/thickEnd, which always hold
//! the unpadded extent so single-position padding can be inverted.

pub mod policy;
pub mod reader;
pub mod writer;

use serde::{Deserialize, Serialize};

use crate::core::types::Strand;
use crate::utils::validation::md5_hex;

pub use policy::{BedColumns, FormattingPolicy};

/// Marker that starts the header line
pub const HEADER_MARKER: &str = "#bedmaker";

/// Policy information recorded in a file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStamp {
    pub policy_id: String,
    pub policy_digest: String,
    pub point_padding: u64,
}

impl PolicyStamp {
    #[must_use]
    pub fn header_line(&self) -> String {
        format!(
            "{HEADER_MARKER}\tpolicy={}\tpolicy_digest={}\tpoint_padding={}",
            self.policy_id, self.policy_digest, self.point_padding
        )
    }
}

/// One line of a BED file, coordinates as written (0-based half-open)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedRecord {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub name: Option<String>,
    pub score: Option<u16>,
    pub strand: Option<Strand>,
    pub thick_start: Option<u64>,
    pub thick_end: Option<u64>,
}

impl BedRecord {
    /// Render the record as one tab-separated line (no newline)
    #[must_use]
    pub fn render(&self) -> String {
        let mut fields = vec![
            self.chromosome.clone(),
            self.start.to_string(),
            self.end.to_string(),
        ];
        if let Some(name) = &self.name {
            fields.push(name.clone());
        }
        if self.score.is_some() || self.strand.is_some() {
            fields.push(self.score.unwrap_or(0).to_string());
            fields.push(self.strand.unwrap_or(Strand::Unknown).as_str().to_string());
        }
        if let (Some(thick_start), Some(thick_end)) = (self.thick_start, self.thick_end) {
            fields.push(thick_start.to_string());
            fields.push(thick_end.to_string());
        }
        fields.join("\t")
    }

    /// Extent whose padding, if any, has been removed
    #[must_use]
    pub fn unpadded_extent(&self) -> (u64, u64) {
        match (self.thick_start, self.thick_end) {
            (Some(start), Some(end)) => (start, end),
            _ => (self.start, self.end),
        }
    }
}

/// An emitted BED file.
///
/// Owns copies of everything it was rendered from, so later changes to the
/// panel never affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedFile {
    /// Policy the file was produced with, when known
    pub policy_id: Option<String>,

    /// Header stamp, present when the header line is (or will be) written
    pub stamp: Option<PolicyStamp>,

    pub records: Vec<BedRecord>,
}

impl BedFile {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact file contents (uncompressed)
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(stamp) = &self.stamp {
            out.push_str(&stamp.header_line());
            out.push('\n');
        }
        for record in &self.records {
            out.push_str(&record.render());
            out.push('\n');
        }
        out
    }

    /// md5 of the uncompressed contents; the key of the audit log
    #[must_use]
    pub fn artifact_hash(&self) -> String {
        md5_hex(self.render().as_bytes())
    }
}
