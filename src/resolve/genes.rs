use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::core::transcript::Transcript;
use crate::core::types::{ManeType, SourceKind};
use crate::error::Error;
use crate::resolve::identifiers::{parse_transcript_query, TranscriptQuery};
use crate::resolve::source::AnnotationSource;
use crate::resolve::transcripts::{
    build_transcript, has_mane, select_version, TaggedCandidate, TranscriptResolver,
};
use crate::resolve::{resolve_in_order, ResolverOptions};

/// Resolves gene symbols or gene identifiers into their transcripts
pub struct GeneResolver<'a> {
    source: &'a dyn AnnotationSource,
    transcripts: TranscriptResolver<'a>,
    options: &'a ResolverOptions,
}

impl<'a> GeneResolver<'a> {
    pub fn new(source: &'a dyn AnnotationSource, options: &'a ResolverOptions) -> Self {
        Self {
            source,
            transcripts: TranscriptResolver::new(source, options),
            options,
        }
    }

    /// Resolve one gene into the transcripts selected for it.
    ///
    /// By default the MANE Select transcript is chosen (with its MANE Plus
    /// Clinical partner when configured). Genes without MANE coverage resolve
    /// to all of their transcripts when none is protein-coding, or to their
    /// only transcript; anything else is ambiguous.
    ///
    /// # Errors
    ///
    /// `UnknownGene` when the annotation service knows no transcripts,
    /// `AmbiguousIdentifier` when no selection rule applies, `ExternalService`
    /// when any lookup fails.
    pub fn resolve(&self, gene: &str) -> Result<Vec<Transcript>, Error> {
        let gene = gene.trim();
        let unknown = || Error::UnknownGene {
            gene: gene.to_string(),
        };
        if gene.is_empty() {
            return Err(unknown());
        }

        let ids = self.source.resolve_gene(gene)?;
        let queries = self.queries(gene, &ids);
        if queries.is_empty() {
            return Err(unknown());
        }
        debug!("{gene}: {} candidate transcript(s)", queries.len());

        let lookups: Vec<Result<TaggedCandidate, Error>> = queries
            .par_iter()
            .map(|q| {
                self.transcripts
                    .candidates(q)
                    .and_then(|c| select_version(&q.raw, c))
            })
            .collect();

        let chosen = self.select(gene, lookups)?;
        info!(
            "{gene}: selected {}",
            chosen.iter().map(|c| c.id.to_string()).collect::<Vec<_>>().join(", ")
        );

        chosen
            .into_iter()
            .map(|candidate| {
                let requested = candidate.id.accession.clone();
                build_transcript(
                    &requested,
                    candidate,
                    SourceKind::Gene,
                    gene,
                    self.options.feature,
                )
            })
            .collect()
    }

    /// Resolve a batch of genes concurrently, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by any gene.
    pub fn resolve_batch(&self, genes: &[String]) -> Result<Vec<Vec<Transcript>>, Error> {
        resolve_in_order(genes, |g| self.resolve(g))
    }

    /// Parse the gene's transcript list, keeping the preferred namespace when present
    fn queries(&self, gene: &str, ids: &[String]) -> Vec<TranscriptQuery> {
        let mut seen = HashSet::new();
        let parsed: Vec<TranscriptQuery> = ids
            .iter()
            .filter_map(|id| match parse_transcript_query(id) {
                Ok(q) => Some(q),
                Err(e) => {
                    debug!("{gene}: skipping transcript '{id}': {e}");
                    None
                }
            })
            .filter(|q| seen.insert(q.raw.clone()))
            .collect();

        let preferred: Vec<TranscriptQuery> = parsed
            .iter()
            .filter(|q| q.namespace == self.options.preferred_namespace)
            .cloned()
            .collect();
        if preferred.is_empty() {
            parsed
        } else {
            preferred
        }
    }

    fn select(
        &self,
        gene: &str,
        lookups: Vec<Result<TaggedCandidate, Error>>,
    ) -> Result<Vec<TaggedCandidate>, Error> {
        let mut resolved = Vec::new();
        let mut failures = Vec::new();
        for lookup in lookups {
            match lookup {
                Ok(candidate) => resolved.push(candidate),
                // A service failure aborts the gene, never a partial selection
                Err(e @ Error::ExternalService { .. }) => return Err(e),
                Err(e) => failures.push(e),
            }
        }

        if self.options.all_transcripts {
            if let Some(e) = failures.into_iter().next() {
                return Err(e);
            }
            if resolved.is_empty() {
                return Err(Error::UnknownGene {
                    gene: gene.to_string(),
                });
            }
            return Ok(resolved);
        }

        let select: Vec<TaggedCandidate> = resolved
            .iter()
            .filter(|c| has_mane(c, ManeType::Select))
            .cloned()
            .collect();
        let plus_clinical: Vec<TaggedCandidate> = resolved
            .iter()
            .filter(|c| has_mane(c, ManeType::PlusClinical))
            .cloned()
            .collect();

        match select.len() {
            1 => {
                let mut chosen = select;
                if self.options.include_plus_clinical {
                    chosen.extend(plus_clinical);
                }
                return Ok(chosen);
            }
            0 => {}
            _ => {
                return Err(Error::AmbiguousIdentifier {
                    identifier: gene.to_string(),
                    candidates: select.iter().map(|c| c.id.to_string()).collect(),
                })
            }
        }

        if !plus_clinical.is_empty() {
            warn!("{gene} has a MANE Plus Clinical transcript but no MANE Select transcript");
            if self.options.include_plus_clinical {
                return Ok(plus_clinical);
            }
        }

        if resolved.is_empty() {
            return Err(failures.into_iter().next().unwrap_or(Error::UnknownGene {
                gene: gene.to_string(),
            }));
        }
        if failures.is_empty()
            && (resolved.len() == 1 || resolved.iter().all(|c| !c.record.is_protein_coding()))
        {
            return Ok(resolved);
        }

        let mut candidates: Vec<String> = resolved.iter().map(|c| c.id.to_string()).collect();
        candidates.extend(failures.iter().map(ToString::to_string));
        Err(Error::AmbiguousIdentifier {
            identifier: gene.to_string(),
            candidates,
        })
    }
}
