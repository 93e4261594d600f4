use tracing::debug;

use crate::core::chromosome::normalize_chromosome;
use crate::core::region::GenomicRegion;
use crate::core::transcript::Transcript;
use crate::core::types::{ManeType, SourceKind, StableId, Strand};
use crate::error::Error;
use crate::resolve::identifiers::{parse_transcript_query, tag_stable_id, TranscriptQuery};
use crate::resolve::source::{AnnotationSource, TranscriptCandidate};
use crate::resolve::{resolve_in_order, ResolverOptions, TranscriptFeature};

/// A service record whose stable identifier has been tagged with its namespace
#[derive(Debug, Clone)]
pub struct TaggedCandidate {
    pub id: StableId,
    pub record: TranscriptCandidate,
}

impl TaggedCandidate {
    fn describe(&self) -> String {
        let mane = self
            .record
            .mane
            .map(|m| format!(", {m}"))
            .unwrap_or_default();
        format!(
            "{} ({}:{}-{}{mane})",
            self.id, self.record.chromosome, self.record.start, self.record.stop
        )
    }

    fn same_record(&self, other: &Self) -> bool {
        self.id == other.id
            && self.record.chromosome == other.record.chromosome
            && self.record.start == other.record.start
            && self.record.stop == other.record.stop
    }
}

/// Resolves RefSeq or Ensembl transcript identifiers into regions
pub struct TranscriptResolver<'a> {
    source: &'a dyn AnnotationSource,
    options: &'a ResolverOptions,
}

impl<'a> TranscriptResolver<'a> {
    pub fn new(source: &'a dyn AnnotationSource, options: &'a ResolverOptions) -> Self {
        Self { source, options }
    }

    /// Resolve one transcript identifier.
    ///
    /// # Errors
    ///
    /// `UnresolvedIdentifier` when the format is unsupported or the service has
    /// no usable match, `AmbiguousIdentifier` when several versions are equally
    /// valid, `ExternalService` when the lookup fails.
    pub fn resolve(&self, identifier: &str) -> Result<Transcript, Error> {
        let query = parse_transcript_query(identifier)?;
        let candidates = self.candidates(&query)?;
        let chosen = select_version(&query.raw, candidates)?;
        build_transcript(
            &query.raw,
            chosen,
            SourceKind::Transcript,
            &query.raw,
            self.options.feature,
        )
    }

    /// Resolve a batch concurrently.
    ///
    /// Output order follows input order. The first failure aborts the batch.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by any identifier.
    pub fn resolve_batch(&self, identifiers: &[String]) -> Result<Vec<Transcript>, Error> {
        resolve_in_order(identifiers, |id| self.resolve(id))
    }

    /// Fetch, tag and filter the service records for a query.
    ///
    /// # Errors
    ///
    /// `UnresolvedIdentifier` when nothing usable remains after filtering.
    pub fn candidates(&self, query: &TranscriptQuery) -> Result<Vec<TaggedCandidate>, Error> {
        let records = self.source.resolve_transcript(&query.raw)?;
        if records.is_empty() {
            return Err(Error::unresolved(
                &query.raw,
                "no match from the annotation service",
            ));
        }

        let returned = records.len();
        let mut tagged: Vec<TaggedCandidate> = Vec::with_capacity(returned);
        for record in records {
            let Some(id) = tag_stable_id(query.namespace, &record.stable_id, record.stable_id_version)
            else {
                debug!(
                    "Ignoring '{}' returned for {}: not a {} accession",
                    record.stable_id, query.raw, query.namespace
                );
                continue;
            };
            if id.accession != query.accession {
                debug!("Ignoring {id} returned for {}: different accession", query.raw);
                continue;
            }
            if query.version.is_some() && id.version != query.version {
                continue;
            }
            if let Some(assembly) = &record.assembly {
                if !self.options.assembly.matches_label(assembly) {
                    debug!("Ignoring {id} on {assembly} (want {})", self.options.assembly);
                    continue;
                }
            }
            if normalize_chromosome(&record.chromosome).is_none() {
                debug!("Ignoring {id} on non-canonical contig {}", record.chromosome);
                continue;
            }

            let candidate = TaggedCandidate { id, record };
            if !tagged.iter().any(|t| t.same_record(&candidate)) {
                tagged.push(candidate);
            }
        }

        if tagged.is_empty() {
            return Err(Error::unresolved(
                &query.raw,
                format!(
                    "{returned} record(s) returned but none is a {} {} transcript on the primary assembly",
                    self.options.assembly, query.namespace
                ),
            ));
        }
        Ok(tagged)
    }
}

/// Pick the single version of an accession to use.
///
/// A lone candidate wins outright. Otherwise the MANE-flagged candidate is
/// preferred; without MANE coverage, non-coding transcripts resolve directly
/// to their latest version while protein-coding ones are ambiguous.
///
/// # Errors
///
/// `AmbiguousIdentifier` listing every candidate when no rule applies.
pub fn select_version(
    identifier: &str,
    mut candidates: Vec<TaggedCandidate>,
) -> Result<TaggedCandidate, Error> {
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }

    let mut mane: Vec<&TaggedCandidate> = candidates.iter().filter(|c| c.record.mane.is_some()).collect();
    if mane.len() == 1 {
        let chosen = mane.remove(0).clone();
        debug!("{identifier}: chose MANE transcript {}", chosen.id);
        return Ok(chosen);
    }

    if mane.is_empty() && candidates.iter().all(|c| !c.record.is_protein_coding()) {
        let latest = candidates.iter().map(|c| c.id.version).max().flatten();
        let mut newest: Vec<&TaggedCandidate> =
            candidates.iter().filter(|c| c.id.version == latest).collect();
        if newest.len() == 1 {
            let chosen = newest.remove(0).clone();
            debug!("{identifier}: non-coding, chose latest version {}", chosen.id);
            return Ok(chosen);
        }
    }

    Err(Error::AmbiguousIdentifier {
        identifier: identifier.to_string(),
        candidates: candidates.iter().map(TaggedCandidate::describe).collect(),
    })
}

/// Turn the chosen candidate into a [`Transcript`] and its regions.
///
/// # Errors
///
/// `ExternalService` when the service returned coordinates that cannot form a region.
pub fn build_transcript(
    requested: &str,
    chosen: TaggedCandidate,
    source_kind: SourceKind,
    source_identifier: &str,
    feature: TranscriptFeature,
) -> Result<Transcript, Error> {
    let TaggedCandidate { id, record } = chosen;
    let resolved = id.to_string();
    let strand = record.strand.map(Strand::from_i8);

    let invalid = |e: Error| Error::ExternalService {
        service: "annotation".to_string(),
        message: format!("invalid coordinates returned for {resolved}: {e}"),
    };

    let span = || -> Result<Vec<GenomicRegion>, Error> {
        let region = GenomicRegion::new(
            resolved.clone(),
            &record.chromosome,
            record.start,
            record.stop,
            source_kind,
            source_identifier,
        )
        .map_err(invalid)?
        .with_strand(strand);
        Ok(vec![region])
    };

    let regions = match feature {
        TranscriptFeature::Span => span()?,
        TranscriptFeature::Exons if record.exons.is_empty() => {
            debug!("{resolved} has no exon records, using the transcript span");
            span()?
        }
        TranscriptFeature::Exons => {
            let mut exons = record.exons.clone();
            exons.sort_by_key(|e| e.order);
            exons
                .iter()
                .map(|exon| {
                    GenomicRegion::new(
                        format!("{resolved}_exon{}", exon.order),
                        &record.chromosome,
                        exon.start,
                        exon.stop,
                        source_kind,
                        source_identifier,
                    )
                    .map(|r| r.with_strand(strand))
                    .map_err(invalid)
                })
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(Transcript {
        requested_identifier: requested.to_string(),
        resolved_identifier: id,
        mane: record.mane,
        biotype: record.biotype,
        gene_name: record.gene_name,
        regions,
    })
}

/// True when the candidate carries the given MANE designation
#[must_use]
pub fn has_mane(candidate: &TaggedCandidate, mane: ManeType) -> bool {
    candidate.record.mane == Some(mane)
}
