use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::chromosome::{compare_chromosomes, normalize_chromosome};
use crate::core::types::{SourceKind, Strand};
use crate::error::Error;

/// A chromosome position range in canonical coordinates (1-based, closed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locus {
    pub chromosome: String,
    pub start: u64,
    pub stop: u64,
}

impl Locus {
    pub fn new(chromosome: impl Into<String>, start: u64, stop: u64) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            stop,
        }
    }

    /// True when `other` lies entirely within this locus
    #[must_use]
    pub fn contains(&self, other: &Locus) -> bool {
        self.chromosome == other.chromosome && self.start <= other.start && other.stop <= self.stop
    }

    /// True when the two loci share at least one base
    #[must_use]
    pub fn overlaps(&self, other: &Locus) -> bool {
        self.chromosome == other.chromosome && self.start <= other.stop && other.start <= self.stop
    }
}

impl std::fmt::Display for Locus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.stop)
    }
}

impl Ord for Locus {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_chromosomes(&self.chromosome, &other.chromosome)
            .then(self.start.cmp(&other.start))
            .then(self.stop.cmp(&other.stop))
    }
}

impl PartialOrd for Locus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Convert a 1-based closed range to the 0-based half-open form used on disk
#[must_use]
pub fn to_half_open(start: u64, stop: u64) -> (u64, u64) {
    (start.saturating_sub(1), stop)
}

/// Convert a 0-based half-open range back to 1-based closed.
///
/// Returns `None` for empty or inverted ranges, which have no closed equivalent.
#[must_use]
pub fn from_half_open(start: u64, end: u64) -> Option<(u64, u64)> {
    if end <= start {
        None
    } else {
        Some((start + 1, end))
    }
}

/// One region of interest in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicRegion {
    /// Deterministic identifier, unique within a resolution batch
    pub region_id: String,

    /// Canonical UCSC-style chromosome name
    pub chromosome: String,

    /// 1-based inclusive start
    pub start: u64,

    /// 1-based inclusive stop
    pub stop: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<Strand>,

    /// Resolver that produced the region
    pub source_kind: SourceKind,

    /// The user-supplied identifier the region was resolved from
    pub source_identifier: String,
}

impl GenomicRegion {
    /// Build a region, canonicalizing the chromosome and checking coordinates.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCoordinate` for an unknown chromosome, a zero
    /// start, or `start > stop`.
    pub fn new(
        region_id: impl Into<String>,
        chromosome: &str,
        start: u64,
        stop: u64,
        source_kind: SourceKind,
        source_identifier: impl Into<String>,
    ) -> Result<Self, Error> {
        let region_id = region_id.into();
        let canonical = normalize_chromosome(chromosome).ok_or_else(|| Error::InvalidCoordinate {
            region_id: region_id.clone(),
            reason: format!("unrecognised chromosome '{chromosome}'"),
        })?;

        let region = Self {
            region_id,
            chromosome: canonical,
            start,
            stop,
            strand: None,
            source_kind,
            source_identifier: source_identifier.into(),
        };
        region.validate()?;
        Ok(region)
    }

    #[must_use]
    pub fn with_strand(mut self, strand: Option<Strand>) -> Self {
        self.strand = strand;
        self
    }

    /// Check the region invariants.
    ///
    /// Regions read back from a pipe are checked again since the pipe may have
    /// been edited by hand.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCoordinate` describing the first violated invariant.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| Error::InvalidCoordinate {
            region_id: self.region_id.clone(),
            reason,
        };

        if self.region_id.trim().is_empty() {
            return Err(invalid(format!("empty region id at {}", self.locus())));
        }
        if normalize_chromosome(&self.chromosome).as_deref() != Some(self.chromosome.as_str()) {
            return Err(invalid(format!(
                "chromosome '{}' is not in canonical form",
                self.chromosome
            )));
        }
        if self.start == 0 {
            return Err(invalid("start must be >= 1 (1-based coordinates)".to_string()));
        }
        if self.start > self.stop {
            return Err(invalid(format!(
                "start {} is greater than stop {}",
                self.start, self.stop
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn locus(&self) -> Locus {
        Locus::new(self.chromosome.clone(), self.start, self.stop)
    }

    /// Number of bases covered
    #[must_use]
    pub fn width(&self) -> u64 {
        self.stop - self.start + 1
    }

    /// True for single-base regions such as SNPs
    #[must_use]
    pub fn is_single_position(&self) -> bool {
        self.start == self.stop
    }

    /// Ordering used for panels: chromosome, start, then region id
    #[must_use]
    pub fn panel_order(&self, other: &Self) -> Ordering {
        compare_chromosomes(&self.chromosome, &other.chromosome)
            .then(self.start.cmp(&other.start))
            .then(self.region_id.cmp(&other.region_id))
            .then(self.stop.cmp(&other.stop))
    }
}

/// Derive the id used for coordinate regions given without a name
#[must_use]
pub fn derived_region_id(chromosome: &str, start: u64, stop: u64) -> String {
    format!("{chromosome}:{start}-{stop}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(chr: &str, start: u64, stop: u64) -> Result<GenomicRegion, Error> {
        GenomicRegion::new("r", chr, start, stop, SourceKind::Coordinate, "r")
    }

    #[test]
    fn test_new_normalizes_chromosome() {
        let r = region("17", 7_565_097, 7_565_097).unwrap();
        assert_eq!(r.chromosome, "chr17");
        assert!(r.is_single_position());
        assert_eq!(r.width(), 1);
    }

    #[test]
    fn test_new_rejects_bad_coordinates() {
        assert!(matches!(
            region("chr1", 0, 10),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            region("chr1", 20, 10),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            region("chrUn", 1, 10),
            Err(Error::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_half_open_conversion_is_a_bijection() {
        for (start, stop) in [(1, 1), (1, 2), (7_565_097, 7_565_097), (100, 250), (248_956_422, 248_956_422)] {
            let (s0, e0) = to_half_open(start, stop);
            assert_eq!(e0 - s0, stop - start + 1, "width preserved for {start}-{stop}");
            assert_eq!(from_half_open(s0, e0), Some((start, stop)));
        }
    }

    #[test]
    fn test_snp_half_open_form() {
        // chr17:7565097 (1-based) is [7565096, 7565097) on disk
        assert_eq!(to_half_open(7_565_097, 7_565_097), (7_565_096, 7_565_097));
    }

    #[test]
    fn test_from_half_open_rejects_empty() {
        assert_eq!(from_half_open(10, 10), None);
        assert_eq!(from_half_open(10, 9), None);
    }

    #[test]
    fn test_panel_order() {
        let a = GenomicRegion::new("b", "chr2", 5, 10, SourceKind::Coordinate, "b").unwrap();
        let b = GenomicRegion::new("a", "chr2", 5, 10, SourceKind::Coordinate, "a").unwrap();
        let c = GenomicRegion::new("z", "chr10", 1, 2, SourceKind::Coordinate, "z").unwrap();
        let mut regions = vec![c.clone(), a.clone(), b.clone()];
        regions.sort_by(GenomicRegion::panel_order);
        assert_eq!(regions, vec![b, a, c]);
    }

    #[test]
    fn test_locus_relations() {
        let outer = Locus::new("chr1", 100, 200);
        assert!(outer.contains(&Locus::new("chr1", 100, 200)));
        assert!(outer.contains(&Locus::new("chr1", 150, 160)));
        assert!(!outer.contains(&Locus::new("chr1", 150, 201)));
        assert!(outer.overlaps(&Locus::new("chr1", 200, 300)));
        assert!(!outer.overlaps(&Locus::new("chr2", 100, 200)));
        assert_eq!(outer.to_string(), "chr1:100-200");
    }
}
