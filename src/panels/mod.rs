//! Region consolidation: many resolver streams in, one ordered [`Panel`] out.
//!
//! Rules, applied to the union of all streams:
//!
//! - every region is re-validated
//! - the same `region_id` at two different loci is a fatal [`Error::Conflict`]
//! - the same `region_id` at the same locus is collapsed to one entry and
//!   recorded in provenance `duplicates`
//! - different ids at the same locus are all kept and recorded in
//!   provenance `co_located`
//! - the result is sorted by chromosome, start, then region id
//!
//! Consolidation is all or nothing: on error no panel is produced.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

use crate::core::panel::{CoLocation, DuplicateRegion, Panel, Provenance, RegionSource};
use crate::core::region::{GenomicRegion, Locus};
use crate::core::types::Strand;
use crate::error::Error;
use crate::resolve::RegionStream;
use crate::utils::validation::md5_hex;

/// Collects region streams and source file hashes, then builds a [`Panel`]
#[derive(Debug, Default)]
pub struct Consolidator {
    regions: Vec<GenomicRegion>,
    source_file_hashes: BTreeMap<String, String>,
}

struct Entry {
    region: GenomicRegion,
    occurrences: usize,
    sources: BTreeSet<RegionSource>,
}

impl Consolidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stream(&mut self, stream: RegionStream) -> &mut Self {
        debug!("Adding {} {} region(s)", stream.regions.len(), stream.source_kind);
        self.regions.extend(stream.regions);
        self
    }

    pub fn add_regions(&mut self, regions: impl IntoIterator<Item = GenomicRegion>) -> &mut Self {
        self.regions.extend(regions);
        self
    }

    /// Record the md5 of an upstream file's bytes
    pub fn add_source_file(&mut self, name: impl Into<String>, bytes: &[u8]) -> &mut Self {
        self.source_file_hashes.insert(name.into(), md5_hex(bytes));
        self
    }

    /// Record the md5 of an upstream file on disk
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn add_source_path(&mut self, path: &Path) -> Result<&mut Self, Error> {
        let bytes = std::fs::read(path)?;
        Ok(self.add_source_file(path.display().to_string(), &bytes))
    }

    /// Build the panel.
    ///
    /// # Errors
    ///
    /// `Error::InvalidCoordinate` for a region that breaks the coordinate
    /// invariants, `Error::Conflict` when one id resolves to two loci.
    pub fn build(self) -> Result<Panel, Error> {
        let total = self.regions.len();
        let mut by_id: BTreeMap<String, Entry> = BTreeMap::new();

        for region in self.regions {
            region.validate()?;
            let source = RegionSource::of(&region);

            match by_id.get_mut(&region.region_id) {
                None => {
                    by_id.insert(
                        region.region_id.clone(),
                        Entry {
                            sources: BTreeSet::from([source]),
                            occurrences: 1,
                            region,
                        },
                    );
                }
                Some(entry) => {
                    let (kept, new) = (entry.region.locus(), region.locus());
                    if kept != new {
                        // Report the pair in a fixed order so the message does not depend on arrival order
                        let (first, second) = if kept <= new { (kept, new) } else { (new, kept) };
                        return Err(Error::Conflict {
                            region_id: region.region_id,
                            first,
                            second,
                        });
                    }
                    entry.occurrences += 1;
                    entry.sources.insert(source);
                    if representative_key(&region) < representative_key(&entry.region) {
                        entry.region = region;
                    }
                }
            }
        }

        let mut provenance = Provenance::now();
        provenance.source_file_hashes = self.source_file_hashes;

        let mut regions = Vec::with_capacity(by_id.len());
        for (region_id, entry) in by_id {
            if entry.occurrences > 1 {
                debug!(
                    "Collapsed {} copies of {region_id} from {} source(s)",
                    entry.occurrences,
                    entry.sources.len()
                );
                provenance.duplicates.push(DuplicateRegion {
                    region_id,
                    occurrences: entry.occurrences,
                    sources: entry.sources.into_iter().collect(),
                });
            }
            regions.push(entry.region);
        }
        regions.sort_by(GenomicRegion::panel_order);

        let mut by_locus: BTreeMap<Locus, Vec<String>> = BTreeMap::new();
        for region in &regions {
            by_locus.entry(region.locus()).or_default().push(region.region_id.clone());
        }
        for (locus, mut region_ids) in by_locus {
            if region_ids.len() > 1 {
                region_ids.sort();
                info!("Co-located regions at {locus}: {}", region_ids.join(", "));
                provenance.co_located.push(CoLocation { locus, region_ids });
            }
        }

        info!(
            "Consolidated {total} region(s) into a panel of {} ({} duplicate id(s), {} co-location(s))",
            regions.len(),
            provenance.duplicates.len(),
            provenance.co_located.len()
        );
        Ok(Panel { regions, provenance })
    }
}

/// Among identical copies, keep the one with the smallest source so the result
/// does not depend on which stream arrived first
fn representative_key(region: &GenomicRegion) -> (RegionSource, Option<Strand>) {
    (RegionSource::of(region), region.strand)
}

/// Consolidate resolver streams in one call
///
/// # Errors
///
/// As for [`Consolidator::build`].
pub fn consolidate(streams: Vec<RegionStream>) -> Result<Panel, Error> {
    let mut consolidator = Consolidator::new();
    for stream in streams {
        consolidator.add_stream(stream);
    }
    consolidator.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceKind;

    fn region(id: &str, chr: &str, start: u64, stop: u64, kind: SourceKind, source: &str) -> GenomicRegion {
        GenomicRegion::new(id, chr, start, stop, kind, source).unwrap()
    }

    fn coordinate(id: &str, chr: &str, start: u64, stop: u64) -> GenomicRegion {
        region(id, chr, start, stop, SourceKind::Coordinate, id)
    }

    #[test]
    fn test_unique_ids_are_all_kept_in_order() {
        let mut consolidator = Consolidator::new();
        consolidator.add_regions(vec![
            coordinate("c", "chrX", 5, 10),
            coordinate("b", "chr10", 5, 10),
            coordinate("a", "chr2", 50, 60),
            coordinate("d", "chr2", 5, 10),
        ]);
        let panel = consolidator.build().unwrap();
        let ids: Vec<&str> = panel.regions.iter().map(|r| r.region_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
        assert!(panel.provenance.duplicates.is_empty());
        assert!(panel.provenance.co_located.is_empty());
    }

    #[test]
    fn test_conflicting_id_fails_whole_batch() {
        let mut consolidator = Consolidator::new();
        consolidator.add_regions(vec![
            coordinate("ok", "chr1", 1, 2),
            coordinate("TP53_hotspot", "chr17", 7_565_098, 7_565_098),
            coordinate("TP53_hotspot", "chr17", 7_565_097, 7_565_097),
        ]);
        match consolidator.build() {
            Err(Error::Conflict { region_id, first, second }) => {
                assert_eq!(region_id, "TP53_hotspot");
                assert_eq!(first, Locus::new("chr17", 7_565_097, 7_565_097));
                assert_eq!(second, Locus::new("chr17", 7_565_098, 7_565_098));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_co_located_ids_are_kept_and_flagged() {
        let mut consolidator = Consolidator::new();
        consolidator.add_regions(vec![
            region("rs28934578", "chr17", 7_675_088, 7_675_088, SourceKind::Snp, "rs28934578"),
            coordinate("TP53_R175", "chr17", 7_675_088, 7_675_088),
        ]);
        let panel = consolidator.build().unwrap();
        assert_eq!(panel.len(), 2);
        assert_eq!(panel.provenance.co_located.len(), 1);
        assert_eq!(
            panel.provenance.co_located[0].region_ids,
            vec!["TP53_R175", "rs28934578"]
        );
    }

    #[test]
    fn test_exact_duplicates_collapse_with_provenance() {
        let via_gene = region("NM_007294.4", "chr17", 43_044_295, 43_125_483, SourceKind::Gene, "BRCA1");
        let direct = region("NM_007294.4", "chr17", 43_044_295, 43_125_483, SourceKind::Transcript, "NM_007294");

        let mut forward = Consolidator::new();
        forward.add_regions(vec![via_gene.clone(), direct.clone()]);
        let forward = forward.build().unwrap();

        let mut reverse = Consolidator::new();
        reverse.add_regions(vec![direct, via_gene]);
        let reverse = reverse.build().unwrap();

        assert_eq!(forward.len(), 1);
        assert_eq!(forward.regions, reverse.regions);
        assert_eq!(forward.regions[0].source_kind, SourceKind::Transcript);
        let dup = &forward.provenance.duplicates[0];
        assert_eq!(dup.occurrences, 2);
        assert_eq!(dup.sources.len(), 2);
    }

    #[test]
    fn test_invalid_region_rejected() {
        let mut bad = coordinate("bad", "chr1", 5, 10);
        bad.start = 11;
        let mut consolidator = Consolidator::new();
        consolidator.add_regions(vec![bad]);
        assert!(matches!(consolidator.build(), Err(Error::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_source_hashes_recorded() {
        let mut consolidator = Consolidator::new();
        consolidator
            .add_regions(vec![coordinate("a", "chr1", 1, 1)])
            .add_source_file("regions.jsonl", b"abc");
        let panel = consolidator.build().unwrap();
        assert_eq!(
            panel.provenance.source_file_hashes.get("regions.jsonl").map(String::as_str),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
    }

    #[test]
    fn test_order_independent_of_arrival() {
        let regions = vec![
            coordinate("a", "chr1", 100, 200),
            coordinate("b", "chr1", 100, 200),
            coordinate("c", "chrM", 1, 10),
        ];
        let mut reversed = regions.clone();
        reversed.reverse();

        let one = consolidate(vec![RegionStream { source_kind: SourceKind::Coordinate, regions }]).unwrap();
        let two = consolidate(vec![RegionStream { source_kind: SourceKind::Coordinate, regions: reversed }]).unwrap();
        assert_eq!(one.regions, two.regions);
        assert_eq!(one.digest(), two.digest());
    }
}
