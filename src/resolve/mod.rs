//! Input resolvers.
//!
//! Each resolver turns one kind of user identifier into canonical
//! [`GenomicRegion`]s:
//!
//! | Resolver | Input | Collaborator |
//! |----------|-------|--------------|
//! | [`TranscriptResolver`] | `NM_007294.4`, `ENST00000357654` | [`AnnotationSource`] |
//! | [`GeneResolver`] | `BRCA1` | [`AnnotationSource`] |
//! | [`coordinates`] | `chr17,7565097,7565097,TP53_hotspot` | none |
//! | [`SnpResolver`] | `rs121913529` | [`VariantSource`] |
//!
//! Batches are resolved concurrently with rayon. Output order always follows
//! input order and the first failure aborts the whole batch.
//!
//! [`GenomicRegion`]: crate::core::region::GenomicRegion
//! [`TranscriptResolver`]: transcripts::TranscriptResolver
//! [`GeneResolver`]: genes::GeneResolver
//! [`SnpResolver`]: snps::SnpResolver
//! [`AnnotationSource`]: source::AnnotationSource
//! [`VariantSource`]: source::VariantSource

pub mod coordinates;
pub mod genes;
pub mod identifiers;
pub mod memory;
pub mod snps;
pub mod source;
pub mod transcripts;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::core::panel::{Panel, RegionSource};
use crate::core::region::GenomicRegion;
use crate::core::types::{Assembly, IdentifierNamespace, SourceKind};
use crate::error::Error;

use coordinates::CoordinateInput;
use genes::GeneResolver;
use snps::SnpResolver;
use source::{AnnotationSource, VariantSource};
use transcripts::TranscriptResolver;

/// Which part of a resolved transcript becomes a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptFeature {
    /// The whole transcript, first to last base
    #[default]
    Span,
    /// One region per exon
    Exons,
}

/// Options shared by the transcript and gene resolvers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    pub assembly: Assembly,
    pub feature: TranscriptFeature,
    /// Keep every transcript of a gene instead of its MANE transcript
    pub all_transcripts: bool,
    /// Add the MANE Plus Clinical transcript next to MANE Select
    pub include_plus_clinical: bool,
    /// Namespace used when a gene lists transcripts in both
    pub preferred_namespace: IdentifierNamespace,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            assembly: Assembly::default(),
            feature: TranscriptFeature::default(),
            all_transcripts: false,
            include_plus_clinical: true,
            preferred_namespace: IdentifierNamespace::RefSeq,
        }
    }
}

/// The original user inputs behind a panel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecords {
    pub transcripts: Vec<String>,
    pub coordinates: Vec<CoordinateInput>,
    pub genes: Vec<String>,
    pub snps: Vec<String>,
}

impl InputRecords {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
            && self.coordinates.is_empty()
            && self.genes.is_empty()
            && self.snps.is_empty()
    }

    /// Recover the inputs a panel was resolved from.
    ///
    /// Inputs whose region was collapsed as a duplicate are recovered from the
    /// panel provenance.
    #[must_use]
    pub fn from_panel(panel: &Panel) -> Self {
        let mut inputs = Self::default();
        let mut seen: HashSet<RegionSource> = HashSet::new();

        let collapsed: HashMap<&str, &Vec<RegionSource>> = panel
            .provenance
            .duplicates
            .iter()
            .map(|d| (d.region_id.as_str(), &d.sources))
            .collect();

        for region in &panel.regions {
            let mut sources = vec![RegionSource::of(region)];
            if let Some(extra) = collapsed.get(region.region_id.as_str()) {
                sources.extend(extra.iter().cloned());
            }
            for source in sources {
                if !seen.insert(source.clone()) {
                    continue;
                }
                match source.source_kind {
                    SourceKind::Transcript => inputs.transcripts.push(source.source_identifier),
                    SourceKind::Gene => inputs.genes.push(source.source_identifier),
                    SourceKind::Snp => inputs.snps.push(source.source_identifier),
                    SourceKind::Coordinate => inputs.coordinates.push(CoordinateInput::from_region(region)),
                }
            }
        }
        inputs
    }
}

/// One resolver's output, ready for the consolidator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionStream {
    pub source_kind: SourceKind,
    pub regions: Vec<GenomicRegion>,
}

/// All resolvers wired to the same collaborators
pub struct Resolvers<'a> {
    annotation: &'a dyn AnnotationSource,
    variants: &'a dyn VariantSource,
    options: ResolverOptions,
}

impl<'a> Resolvers<'a> {
    pub fn new(
        annotation: &'a dyn AnnotationSource,
        variants: &'a dyn VariantSource,
        options: ResolverOptions,
    ) -> Self {
        Self {
            annotation,
            variants,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    #[must_use]
    pub fn transcripts(&self) -> TranscriptResolver<'_> {
        TranscriptResolver::new(self.annotation, &self.options)
    }

    #[must_use]
    pub fn genes(&self) -> GeneResolver<'_> {
        GeneResolver::new(self.annotation, &self.options)
    }

    #[must_use]
    pub fn snps(&self) -> SnpResolver<'_> {
        SnpResolver::new(self.variants, &self.options)
    }

    /// Resolve every input into one stream per resolver.
    ///
    /// Empty input kinds produce no stream.
    ///
    /// # Errors
    ///
    /// The first resolution error of any resolver; no partial output is returned.
    pub fn resolve(&self, inputs: &InputRecords) -> Result<Vec<RegionStream>, Error> {
        let mut streams = Vec::new();

        if !inputs.transcripts.is_empty() {
            let regions = self
                .transcripts()
                .resolve_batch(&inputs.transcripts)?
                .into_iter()
                .flat_map(|t| t.regions)
                .collect();
            streams.push(RegionStream {
                source_kind: SourceKind::Transcript,
                regions,
            });
        }
        if !inputs.coordinates.is_empty() {
            streams.push(RegionStream {
                source_kind: SourceKind::Coordinate,
                regions: coordinates::resolve_coordinates(&inputs.coordinates)?,
            });
        }
        if !inputs.genes.is_empty() {
            let regions = self
                .genes()
                .resolve_batch(&inputs.genes)?
                .into_iter()
                .flatten()
                .flat_map(|t| t.regions)
                .collect();
            streams.push(RegionStream {
                source_kind: SourceKind::Gene,
                regions,
            });
        }
        if !inputs.snps.is_empty() {
            streams.push(RegionStream {
                source_kind: SourceKind::Snp,
                regions: self.snps().resolve_batch(&inputs.snps)?,
            });
        }

        let total: usize = streams.iter().map(|s| s.regions.len()).sum();
        info!("Resolved {total} region(s) from {} input stream(s)", streams.len());
        Ok(streams)
    }
}

/// Resolve every item in parallel and keep the results in input order.
///
/// The error returned is the first failing item in input order, not the
/// first to fail on the thread pool.
pub(crate) fn resolve_in_order<T, R, F>(items: &[T], resolve: F) -> Result<Vec<R>, Error>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, Error> + Sync + Send,
{
    items
        .par_iter()
        .map(resolve)
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::panel::{DuplicateRegion, Provenance};
    use crate::core::types::ManeType;
    use crate::resolve::memory::InMemorySource;
    use crate::resolve::source::{TranscriptCandidate, VariantLocation};

    #[test]
    fn test_resolve_in_order_keeps_order_and_first_error() {
        let items: Vec<u32> = (0..200).collect();
        let doubled = resolve_in_order(&items, |i| Ok::<_, Error>(i * 2)).unwrap();
        assert_eq!(doubled, items.iter().map(|i| i * 2).collect::<Vec<_>>());

        let err = resolve_in_order(&items, |i| {
            if i % 50 == 7 {
                Err(Error::InvalidInput(format!("item {i}")))
            } else {
                Ok(*i)
            }
        })
        .unwrap_err();
        assert_eq!(err.to_string(), Error::InvalidInput("item 7".to_string()).to_string());
    }

    fn source() -> InMemorySource {
        let mut source = InMemorySource::new();
        source.add_transcript(TranscriptCandidate {
            stable_id: "NM_007294".to_string(),
            stable_id_version: Some(4),
            assembly: Some("GRCh38".to_string()),
            chromosome: "17".to_string(),
            start: 43_044_295,
            stop: 43_125_483,
            strand: Some(-1),
            biotype: Some("protein_coding".to_string()),
            mane: Some(ManeType::Select),
            gene_name: Some("BRCA1".to_string()),
            exons: vec![],
        });
        source.add_gene("BRCA1", vec!["NM_007294".to_string()]);
        source.add_variant(
            "rs80357906",
            VariantLocation {
                chromosome: "17".to_string(),
                start: 43_057_062,
                stop: 43_057_062,
                assembly: Some("GRCh38".to_string()),
                strand: Some(1),
            },
        );
        source
    }

    #[test]
    fn test_resolve_all_kinds() {
        let source = source();
        let resolvers = Resolvers::new(&source, &source, ResolverOptions::default());
        let inputs = InputRecords {
            transcripts: vec!["NM_007294".to_string()],
            coordinates: vec![CoordinateInput::new("17", 7_565_097, 7_565_097, Some("TP53_hotspot"))],
            genes: vec!["BRCA1".to_string()],
            snps: vec!["rs80357906".to_string()],
        };

        let streams = resolvers.resolve(&inputs).unwrap();
        let kinds: Vec<SourceKind> = streams.iter().map(|s| s.source_kind).collect();
        assert_eq!(
            kinds,
            vec![SourceKind::Transcript, SourceKind::Coordinate, SourceKind::Gene, SourceKind::Snp]
        );
        assert!(streams.iter().all(|s| s.regions.len() == 1));
    }

    #[test]
    fn test_empty_inputs_produce_no_streams() {
        let source = source();
        let resolvers = Resolvers::new(&source, &source, ResolverOptions::default());
        assert!(resolvers.resolve(&InputRecords::default()).unwrap().is_empty());
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_from_panel_recovers_collapsed_inputs() {
        let region = GenomicRegion::new(
            "NM_007294.4",
            "chr17",
            43_044_295,
            43_125_483,
            SourceKind::Gene,
            "BRCA1",
        )
        .unwrap();
        let coordinate = GenomicRegion::new(
            "TP53_hotspot",
            "chr17",
            7_565_097,
            7_565_097,
            SourceKind::Coordinate,
            "TP53_hotspot",
        )
        .unwrap();
        let panel = Panel {
            regions: vec![coordinate, region],
            provenance: Provenance {
                duplicates: vec![DuplicateRegion {
                    region_id: "NM_007294.4".to_string(),
                    occurrences: 2,
                    sources: vec![
                        RegionSource {
                            source_kind: SourceKind::Gene,
                            source_identifier: "BRCA1".to_string(),
                        },
                        RegionSource {
                            source_kind: SourceKind::Transcript,
                            source_identifier: "NM_007294".to_string(),
                        },
                    ],
                }],
                ..Provenance::now()
            },
        };

        let inputs = InputRecords::from_panel(&panel);
        assert_eq!(inputs.genes, vec!["BRCA1"]);
        assert_eq!(inputs.transcripts, vec!["NM_007294"]);
        assert_eq!(inputs.coordinates.len(), 1);
        assert_eq!(inputs.coordinates[0].region_id.as_deref(), Some("TP53_hotspot"));
        assert!(inputs.snps.is_empty());
    }
}
