use tracing::debug;

use crate::core::chromosome::normalize_chromosome;
use crate::core::region::{GenomicRegion, Locus};
use crate::core::types::{SourceKind, Strand};
use crate::error::Error;
use crate::resolve::source::VariantSource;
use crate::resolve::{resolve_in_order, ResolverOptions};
use crate::utils::validation::is_valid_rsid;

/// Resolves dbSNP RefSNP identifiers into single-locus regions
pub struct SnpResolver<'a> {
    source: &'a dyn VariantSource,
    options: &'a ResolverOptions,
}

impl<'a> SnpResolver<'a> {
    pub fn new(source: &'a dyn VariantSource, options: &'a ResolverOptions) -> Self {
        Self { source, options }
    }

    /// Resolve one rsID. The region id is the lowercase rsID.
    ///
    /// # Errors
    ///
    /// `UnresolvedIdentifier` for a malformed rsID or one with no location on
    /// the configured assembly, `AmbiguousIdentifier` when it maps to more than
    /// one distinct location.
    pub fn resolve(&self, rsid: &str) -> Result<GenomicRegion, Error> {
        let raw = rsid.trim();
        if !is_valid_rsid(raw) {
            return Err(Error::unresolved(raw, "not a dbSNP RefSNP identifier (expected rs<digits>)"));
        }
        let rsid = raw.to_lowercase();

        let mut loci: Vec<(Locus, Option<Strand>)> = Vec::new();
        for location in self.source.resolve_variant(&rsid)? {
            if let Some(assembly) = &location.assembly {
                if !self.options.assembly.matches_label(assembly) {
                    continue;
                }
            }
            let Some(chromosome) = normalize_chromosome(&location.chromosome) else {
                debug!("{rsid}: ignoring location on non-canonical contig {}", location.chromosome);
                continue;
            };
            // Insertions are reported with start = stop + 1; keep both flanking bases
            let (start, stop) = if location.start > location.stop {
                (location.stop, location.start)
            } else {
                (location.start, location.stop)
            };
            let locus = Locus::new(chromosome, start, stop);
            if !loci.iter().any(|(l, _)| *l == locus) {
                loci.push((locus, location.strand.map(Strand::from_i8)));
            }
        }

        match loci.len() {
            0 => Err(Error::unresolved(
                &rsid,
                format!("no location on {} primary chromosomes", self.options.assembly),
            )),
            1 => {
                let (locus, strand) = loci.remove(0);
                let region = GenomicRegion::new(
                    rsid.clone(),
                    &locus.chromosome,
                    locus.start,
                    locus.stop,
                    SourceKind::Snp,
                    rsid.clone(),
                )
                .map_err(|e| Error::ExternalService {
                    service: "variation".to_string(),
                    message: format!("invalid location returned for {rsid}: {e}"),
                })?;
                Ok(region.with_strand(strand))
            }
            _ => Err(Error::AmbiguousIdentifier {
                identifier: rsid,
                candidates: loci.iter().map(|(l, _)| l.to_string()).collect(),
            }),
        }
    }

    /// Resolve a batch concurrently, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by any rsID.
    pub fn resolve_batch(&self, rsids: &[String]) -> Result<Vec<GenomicRegion>, Error> {
        resolve_in_order(rsids, |id| self.resolve(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::memory::InMemorySource;
    use crate::resolve::source::VariantLocation;

    fn location(chromosome: &str, start: u64, stop: u64, assembly: &str) -> VariantLocation {
        VariantLocation {
            chromosome: chromosome.to_string(),
            start,
            stop,
            assembly: Some(assembly.to_string()),
            strand: Some(1),
        }
    }

    #[test]
    fn test_resolve_snp() {
        let mut source = InMemorySource::new();
        source.add_variant("rs28934578", location("17", 7_675_088, 7_675_088, "GRCh38"));
        source.add_variant("rs28934578", location("17", 7_578_406, 7_578_406, "GRCh37"));
        source.add_variant("rs28934578", location("HSCHR17_1_CTG1", 1_000, 1_000, "GRCh38"));
        let options = ResolverOptions::default();
        let resolver = SnpResolver::new(&source, &options);

        let region = resolver.resolve("RS28934578").unwrap();
        assert_eq!(region.region_id, "rs28934578");
        assert_eq!(region.chromosome, "chr17");
        assert_eq!((region.start, region.stop), (7_675_088, 7_675_088));
        assert_eq!(region.source_kind, SourceKind::Snp);
        assert!(region.is_single_position());
    }

    #[test]
    fn test_malformed_and_unknown_rsids() {
        let source = InMemorySource::new();
        let options = ResolverOptions::default();
        let resolver = SnpResolver::new(&source, &options);
        assert!(matches!(resolver.resolve("28934578"), Err(Error::UnresolvedIdentifier { .. })));
        assert!(matches!(resolver.resolve("rs1"), Err(Error::UnresolvedIdentifier { .. })));
        // Malformed ids never reach the service
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_multiple_locations_are_ambiguous() {
        let mut source = InMemorySource::new();
        source.add_variant("rs1", location("1", 100, 100, "GRCh38"));
        source.add_variant("rs1", location("2", 100, 100, "GRCh38"));
        let options = ResolverOptions::default();
        let resolver = SnpResolver::new(&source, &options);
        match resolver.resolve("rs1") {
            Err(Error::AmbiguousIdentifier { candidates, .. }) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_insertion_spans_flanking_bases() {
        let mut source = InMemorySource::new();
        source.add_variant("rs2", location("1", 101, 100, "GRCh38"));
        let options = ResolverOptions::default();
        let resolver = SnpResolver::new(&source, &options);
        let region = resolver.resolve("rs2").unwrap();
        assert_eq!((region.start, region.stop), (100, 101));
    }
}
